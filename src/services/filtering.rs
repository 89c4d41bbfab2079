// 筛选与排序求值器
//
// 纯函数集合：解析排序键、从条目中提取可排序值、比较两个可排序值，
// 以及按类型归属和文本匹配过滤列表。固定的求值顺序为
// 搜索 → 类型 → 排序，排序开销最大，必须作用在最小的候选集上

use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;

use crate::models::{parse_sort, Movie, SortDirection};

/// 按日期解释的字段
const DATE_FIELDS: [&str; 2] = ["release_date", "primary_release_date"];

/// 按数值解释的字段
const NUMERIC_FIELDS: [&str; 4] = ["popularity", "revenue", "vote_average", "vote_count"];

/// 从条目中提取出的可排序值
///
/// `Undefined` 表示字段缺失或无法解释，无论排序方向都沉到列表末尾
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
    Undefined,
}

/// 一次求值所需的全部筛选选项
#[derive(Debug, Clone)]
pub struct FilterOptions<'a> {
    pub search_term: &'a str,
    /// 是否应用文本匹配（搜索词达到最小长度阈值时为真）
    pub active_search: bool,
    pub selected_genres: &'a [u32],
    pub selected_sort: &'a str,
    /// 是否允许本地排序；当排序已委托给远程接口时为假
    pub sort_eligible: bool,
}

/// 将日期字符串解析为单调递增的数值时间戳
fn parse_date_value(raw: &str) -> SortValue {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => SortValue::Number(date.num_days_from_ce() as f64),
        Err(_) => SortValue::Undefined,
    }
}

/// 按字段名从条目中提取可排序值
///
/// 日期字段在命名字段缺失/为空时回退到 `release_date`；
/// 数值字段缺失时为 Undefined（不会被强转为 0）；
/// 其余已知字符串字段使用不区分大小写的比较键；未知字段为 Undefined
pub fn sort_value(movie: &Movie, field: &str) -> SortValue {
    if DATE_FIELDS.contains(&field) {
        let named = match field {
            "primary_release_date" => movie.primary_release_date.as_deref(),
            _ => movie.release_date.as_deref(),
        };
        let raw = match named {
            Some(value) if !value.is_empty() => Some(value),
            _ => movie.release_date.as_deref().filter(|v| !v.is_empty()),
        };
        return match raw {
            Some(value) => parse_date_value(value),
            None => SortValue::Undefined,
        };
    }

    if NUMERIC_FIELDS.contains(&field) {
        let value = match field {
            "popularity" => movie.popularity,
            "revenue" => movie.revenue.map(|v| v as f64),
            "vote_average" => movie.vote_average,
            "vote_count" => movie.vote_count.map(|v| v as f64),
            _ => None,
        };
        return match value {
            Some(number) => SortValue::Number(number),
            None => SortValue::Undefined,
        };
    }

    // 其余字段按不区分大小写的字符串处理
    let text = match field {
        "title" => Some(movie.title.as_str()),
        "original_title" => Some(movie.original_title.as_str()),
        "overview" => movie.overview.as_deref(),
        "tagline" => movie.tagline.as_deref(),
        "homepage" => movie.homepage.as_deref(),
        _ => None,
    };
    match text {
        Some(value) => SortValue::Text(value.to_lowercase()),
        None => SortValue::Undefined,
    }
}

/// 比较两个可排序值
///
/// Undefined 无论方向都排在已定义值之后；两个 Undefined 相等；
/// 数值按大小比较，字符串按字典序比较，混合类型视为相等
pub fn compare_values(a: &SortValue, b: &SortValue, direction: SortDirection) -> Ordering {
    match (a, b) {
        (SortValue::Undefined, SortValue::Undefined) => Ordering::Equal,
        (SortValue::Undefined, _) => Ordering::Greater,
        (_, SortValue::Undefined) => Ordering::Less,
        (SortValue::Number(a), SortValue::Number(b)) => {
            let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        (SortValue::Text(a), SortValue::Text(b)) => match direction {
            SortDirection::Asc => a.cmp(b),
            SortDirection::Desc => a.cmp(b).reverse(),
        },
        // 类型字段固定，混合比较不应出现
        _ => Ordering::Equal,
    }
}

/// 条目的类型集合是否包含全部要求的类型（AND 语义）
///
/// 空的要求集合恒为真
pub fn matches_genres(movie: &Movie, required: &[u32]) -> bool {
    if required.is_empty() {
        return true;
    }
    let genre_ids = movie.effective_genre_ids();
    required.iter().all(|id| genre_ids.contains(id))
}

/// 标题或原始标题是否包含搜索词（不区分大小写）
///
/// 空搜索词恒为真
pub fn matches_search(movie: &Movie, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let lower = term.to_lowercase();
    movie.title.to_lowercase().contains(&lower)
        || movie.original_title.to_lowercase().contains(&lower)
}

fn apply_search(movies: Vec<Movie>, term: &str, active: bool) -> Vec<Movie> {
    if !active {
        return movies;
    }
    movies
        .into_iter()
        .filter(|movie| matches_search(movie, term))
        .collect()
}

fn apply_genre_filter(movies: Vec<Movie>, required: &[u32]) -> Vec<Movie> {
    if required.is_empty() {
        return movies;
    }
    movies
        .into_iter()
        .filter(|movie| matches_genres(movie, required))
        .collect()
}

fn apply_sort(mut movies: Vec<Movie>, sort_key: &str, eligible: bool) -> Vec<Movie> {
    if !eligible {
        return movies;
    }
    // 无法识别的排序键保持原序，不报错
    let Some(spec) = parse_sort(sort_key) else {
        return movies;
    };
    movies.sort_by(|a, b| {
        let a_value = sort_value(a, &spec.field);
        let b_value = sort_value(b, &spec.field);
        compare_values(&a_value, &b_value, spec.direction)
    });
    movies
}

/// 对累积列表快照应用完整的筛选与排序
pub fn filter_and_sort(movies: Vec<Movie>, options: &FilterOptions<'_>) -> Vec<Movie> {
    let searched = apply_search(movies, options.search_term, options.active_search);
    let filtered = apply_genre_filter(searched, options.selected_genres);
    apply_sort(filtered, options.selected_sort, options.sort_eligible)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, title: &str) -> Movie {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "original_title": title,
        }))
        .expect("Should build test movie")
    }

    fn movie_with_popularity(id: u64, popularity: Option<f64>) -> Movie {
        let mut m = movie(id, "Movie");
        m.popularity = popularity;
        m
    }

    fn movie_with_genres(id: u64, genre_ids: Vec<u32>) -> Movie {
        let mut m = movie(id, "Movie");
        m.genre_ids = Some(genre_ids);
        m
    }

    #[test]
    fn test_undefined_sorts_last_desc() {
        let movies = vec![
            movie_with_popularity(1, Some(5.0)),
            movie_with_popularity(2, None),
            movie_with_popularity(3, Some(10.0)),
        ];
        let sorted = apply_sort(movies, "popularity.desc", true);
        let ids: Vec<u64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_undefined_sorts_last_asc() {
        let movies = vec![
            movie_with_popularity(1, Some(5.0)),
            movie_with_popularity(2, None),
            movie_with_popularity(3, Some(10.0)),
        ];
        let sorted = apply_sort(movies, "popularity.asc", true);
        let ids: Vec<u64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_invalid_sort_key_keeps_order() {
        let movies = vec![
            movie_with_popularity(1, Some(5.0)),
            movie_with_popularity(2, Some(10.0)),
        ];
        let sorted = apply_sort(movies, "popularity.sideways", true);
        let ids: Vec<u64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_genre_and_semantics() {
        let movies = vec![
            movie_with_genres(1, vec![28, 12]),
            movie_with_genres(2, vec![28]),
            movie_with_genres(3, vec![12, 99]),
        ];
        let filtered = apply_genre_filter(movies, &[28, 12]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_empty_genres_match_all() {
        let movies = vec![movie_with_genres(1, vec![28]), movie(2, "No Genres")];
        assert_eq!(apply_genre_filter(movies, &[]).len(), 2);
    }

    #[test]
    fn test_search_matches_original_title() {
        let mut m = movie(1, "The Dark Knight");
        m.original_title = "Batman Begins".to_string();
        assert!(matches_search(&m, "batman"));
        assert!(matches_search(&m, "KNIGHT"));
        assert!(!matches_search(&m, "superman"));
        assert!(matches_search(&m, ""));
    }

    #[test]
    fn test_date_field_fallback() {
        let mut m = movie(1, "Movie");
        m.release_date = Some("2024-05-01".to_string());
        // primary_release_date 缺失时回退到 release_date
        let value = sort_value(&m, "primary_release_date");
        assert!(matches!(value, SortValue::Number(_)));

        m.release_date = Some("not-a-date".to_string());
        assert_eq!(sort_value(&m, "release_date"), SortValue::Undefined);

        m.release_date = None;
        assert_eq!(sort_value(&m, "release_date"), SortValue::Undefined);
    }

    #[test]
    fn test_date_ordering() {
        let mut older = movie(1, "Older");
        older.release_date = Some("2020-01-01".to_string());
        let mut newer = movie(2, "Newer");
        newer.release_date = Some("2024-01-01".to_string());
        let mut undated = movie(3, "Undated");
        undated.release_date = None;

        let sorted = apply_sort(vec![older, undated, newer], "release_date.desc", true);
        let ids: Vec<u64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_string_sort_case_insensitive() {
        let a = movie(1, "alpha");
        let b = movie(2, "Beta");
        let sorted = apply_sort(vec![b, a], "title.asc", true);
        let ids: Vec<u64> = sorted.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unknown_field_is_undefined() {
        let m = movie(1, "Movie");
        assert_eq!(sort_value(&m, "budget"), SortValue::Undefined);
    }

    #[test]
    fn test_filter_and_sort_order_of_operations() {
        // 搜索先于类型过滤，排序最后作用在缩小后的集合上
        let mut batman = movie_with_genres(1, vec![28]);
        batman.title = "Batman".to_string();
        batman.popularity = Some(5.0);
        let mut batman_two = movie_with_genres(2, vec![28]);
        batman_two.title = "Batman Returns".to_string();
        batman_two.popularity = Some(9.0);
        let mut superman = movie_with_genres(3, vec![28]);
        superman.title = "Superman".to_string();
        superman.popularity = Some(20.0);
        let mut drama = movie_with_genres(4, vec![18]);
        drama.title = "Batman Documentary".to_string();

        let options = FilterOptions {
            search_term: "batman",
            active_search: true,
            selected_genres: &[28],
            selected_sort: "popularity.desc",
            sort_eligible: true,
        };
        let result = filter_and_sort(vec![batman, batman_two, superman, drama], &options);
        let ids: Vec<u64> = result.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_sort_skipped_when_not_eligible() {
        let movies = vec![
            movie_with_popularity(1, Some(1.0)),
            movie_with_popularity(2, Some(100.0)),
        ];
        let options = FilterOptions {
            search_term: "",
            active_search: false,
            selected_genres: &[],
            selected_sort: "popularity.desc",
            sort_eligible: false,
        };
        let result = filter_and_sort(movies, &options);
        let ids: Vec<u64> = result.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
