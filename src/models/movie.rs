// 电影数据模型
//
// 定义了从远程元数据接口返回的电影、类型和分页响应结构，
// 反序列化即是获取边界上的结构校验：缺少必需字段的响应会被拒绝

use serde::{Deserialize, Serialize};

/// 电影类型（Genre）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// 类型列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenresResponse {
    pub genres: Vec<Genre>,
}

/// 电影条目
///
/// `id`、`title`、`original_title` 是必需字段，其余字段在列表响应和
/// 详情响应之间并不一致（列表带 `genre_ids`，详情带 `genres` 对象）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub original_title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub primary_release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Option<Vec<u32>>,
    #[serde(default)]
    pub genres: Option<Vec<Genre>>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

impl Movie {
    /// 获取条目的有效类型 ID 集合
    ///
    /// 列表响应直接携带 `genre_ids`；详情响应只有 `genres` 对象列表，
    /// 此时从对象中投影出 ID；两者都没有时返回空
    pub fn effective_genre_ids(&self) -> Vec<u32> {
        if let Some(ids) = &self.genre_ids {
            return ids.clone();
        }
        if let Some(genres) = &self.genres {
            return genres.iter().map(|g| g.id).collect();
        }
        Vec::new()
    }
}

/// 分页响应
///
/// `total_pages` 为 0 表示空结果集，必须被容忍
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
}

/// 固定榜单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieListType {
    NowPlaying,
    Popular,
    TopRated,
    Upcoming,
}

impl MovieListType {
    /// 全部榜单类型，按展示顺序排列
    pub const ALL: [MovieListType; 4] = [
        MovieListType::NowPlaying,
        MovieListType::Popular,
        MovieListType::TopRated,
        MovieListType::Upcoming,
    ];

    /// 远程接口使用的路径片段
    pub fn as_str(&self) -> &'static str {
        match self {
            MovieListType::NowPlaying => "now_playing",
            MovieListType::Popular => "popular",
            MovieListType::TopRated => "top_rated",
            MovieListType::Upcoming => "upcoming",
        }
    }

    /// 展示用标签
    pub fn label(&self) -> &'static str {
        match self {
            MovieListType::NowPlaying => "Now Playing",
            MovieListType::Popular => "Popular",
            MovieListType::TopRated => "Top Rated",
            MovieListType::Upcoming => "Upcoming",
        }
    }
}
