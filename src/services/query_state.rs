// 查询状态适配器
//
// 将搜索词、类型集合和排序键读写到一个外部持久化的查询存储
// （真实部署中是路由的 URL 查询参数），职责包括：
// - 把多值/缺失的原始输入规范化为标准值
// - 筛选参数只属于发现视图，其余视图读到空/默认值
// - 多个字段更新合并为一次原子 patch 写入
// - 与当前值完全相同的写入视为无操作，其余失败记录日志后吞掉

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::warn;

use crate::models::{FilterState, MovieListType, DEFAULT_SORT};

/// 查询参数键
const KEY_SEARCH: &str = "search";
const KEY_GENRES: &str = "genres";
const KEY_SORT: &str = "sort";

/// 查询存储中的原始值：URL 参数可能重复出现
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

/// 查询存储写入失败的分类
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryStoreError {
    /// 目标状态与当前状态完全相同（对应路由的重复导航失败），静默忽略
    #[error("重复写入：目标状态与当前状态相同")]
    Duplicated,

    /// 其他后端错误，记录日志后吞掉，状态保持不变
    #[error("查询存储错误: {0}")]
    Backend(String),
}

/// 外部持久化查询存储的最小契约
pub trait QueryStore: Send + Sync {
    /// 读取命名参数
    fn get(&self, key: &str) -> Option<QueryValue>;

    /// 原子地写入一组参数更新；值为 None 表示从存储中移除该键
    fn patch(&self, updates: &[(&str, Option<String>)]) -> Result<(), QueryStoreError>;
}

/// 内存实现，供演示程序和测试使用
#[derive(Debug, Default)]
pub struct MemoryQueryStore {
    params: RwLock<HashMap<String, String>>,
}

impl MemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryStore for MemoryQueryStore {
    fn get(&self, key: &str) -> Option<QueryValue> {
        let params = self.params.read().ok()?;
        params.get(key).map(|value| QueryValue::Single(value.clone()))
    }

    fn patch(&self, updates: &[(&str, Option<String>)]) -> Result<(), QueryStoreError> {
        let mut params = self
            .params
            .write()
            .map_err(|e| QueryStoreError::Backend(e.to_string()))?;

        let mut next = params.clone();
        for (key, value) in updates {
            match value {
                Some(value) => {
                    next.insert((*key).to_string(), value.clone());
                }
                None => {
                    next.remove(*key);
                }
            }
        }

        if next == *params {
            return Err(QueryStoreError::Duplicated);
        }
        *params = next;
        Ok(())
    }
}

/// 当前激活的视图
///
/// 筛选参数由发现视图独占；榜单视图读到的筛选状态恒为默认值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseView {
    List(MovieListType),
    Discover,
}

/// 把原始查询值规范化为单个字符串（多值取第一个）
pub fn query_string(value: Option<QueryValue>) -> String {
    match value {
        Some(QueryValue::Single(value)) => value,
        Some(QueryValue::Multi(values)) => values.into_iter().next().unwrap_or_default(),
        None => String::new(),
    }
}

/// 解析逗号分隔的类型 ID 列表，静默丢弃非数字的片段
pub fn parse_genres_query(value: Option<QueryValue>) -> Vec<u32> {
    let raw = match value {
        Some(QueryValue::Single(value)) => value,
        Some(QueryValue::Multi(values)) => values.join(","),
        None => return Vec::new(),
    };
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

/// 视图作用域下的筛选查询适配器
pub struct FilterQueryAdapter<S: QueryStore> {
    store: S,
    view: RwLock<BrowseView>,
}

impl<S: QueryStore> FilterQueryAdapter<S> {
    pub fn new(store: S, view: BrowseView) -> Self {
        Self {
            store,
            view: RwLock::new(view),
        }
    }

    pub fn view(&self) -> BrowseView {
        self.view
            .read()
            .map(|view| *view)
            .unwrap_or(BrowseView::Discover)
    }

    pub fn set_view(&self, view: BrowseView) {
        if let Ok(mut current) = self.view.write() {
            *current = view;
        }
    }

    fn owns_filters(&self) -> bool {
        matches!(self.view(), BrowseView::Discover)
    }

    /// 从存储读出当前的筛选状态
    ///
    /// 非发现视图恒为默认状态，这是视图作用域规则而非缺陷
    pub fn filter_state(&self) -> FilterState {
        if !self.owns_filters() {
            return FilterState::default();
        }

        let sort = query_string(self.store.get(KEY_SORT));
        FilterState {
            search_term: query_string(self.store.get(KEY_SEARCH)),
            selected_genres: parse_genres_query(self.store.get(KEY_GENRES)),
            selected_sort: if sort.is_empty() {
                DEFAULT_SORT.to_string()
            } else {
                sort
            },
        }
    }

    /// 所有写入的汇聚点：重复写入静默忽略，其余失败记录日志后吞掉
    fn update_query(&self, updates: &[(&str, Option<String>)]) {
        if !self.owns_filters() {
            return;
        }
        match self.store.patch(updates) {
            Ok(()) | Err(QueryStoreError::Duplicated) => {}
            Err(err) => {
                warn!("筛选参数写入失败: {}", err);
            }
        }
    }

    pub fn set_search_term(&self, value: &str) {
        let value = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        self.update_query(&[(KEY_SEARCH, value)]);
    }

    pub fn set_selected_genres(&self, genres: &[u32]) {
        let value = if genres.is_empty() {
            None
        } else {
            Some(
                genres
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };
        self.update_query(&[(KEY_GENRES, value)]);
    }

    /// 排序键等于默认值时从查询中整体省略
    pub fn set_selected_sort(&self, sort: &str) {
        let value = if sort == DEFAULT_SORT {
            None
        } else {
            Some(sort.to_string())
        };
        self.update_query(&[(KEY_SORT, value)]);
    }

    /// 一次 patch 清空全部筛选参数
    pub fn reset_filters(&self) {
        self.update_query(&[(KEY_SEARCH, None), (KEY_GENRES, None), (KEY_SORT, None)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_genres_discards_non_numeric() {
        let value = Some(QueryValue::Single("28,abc,12, 99 ,".to_string()));
        assert_eq!(parse_genres_query(value), vec![28, 12, 99]);
        assert!(parse_genres_query(None).is_empty());
    }

    #[test]
    fn test_query_string_takes_first_of_multi() {
        let value = Some(QueryValue::Multi(vec![
            "batman".to_string(),
            "superman".to_string(),
        ]));
        assert_eq!(query_string(value), "batman");
    }

    #[test]
    fn test_filter_state_round_trip() {
        let adapter = FilterQueryAdapter::new(MemoryQueryStore::new(), BrowseView::Discover);

        adapter.set_search_term("batman");
        adapter.set_selected_genres(&[28, 12]);
        adapter.set_selected_sort("release_date.asc");

        let state = adapter.filter_state();
        assert_eq!(state.search_term, "batman");
        assert_eq!(state.selected_genres, vec![28, 12]);
        assert_eq!(state.selected_sort, "release_date.asc");
    }

    #[test]
    fn test_default_sort_omitted_from_store() {
        let adapter = FilterQueryAdapter::new(MemoryQueryStore::new(), BrowseView::Discover);

        adapter.set_selected_sort("vote_average.desc");
        assert!(adapter.store.get(KEY_SORT).is_some());

        adapter.set_selected_sort(DEFAULT_SORT);
        assert!(adapter.store.get(KEY_SORT).is_none());
        assert_eq!(adapter.filter_state().selected_sort, DEFAULT_SORT);
    }

    #[test]
    fn test_list_view_reports_defaults() {
        let adapter = FilterQueryAdapter::new(MemoryQueryStore::new(), BrowseView::Discover);
        adapter.set_search_term("batman");

        adapter.set_view(BrowseView::List(MovieListType::Popular));
        let state = adapter.filter_state();
        assert!(state.search_term.is_empty());
        assert!(state.selected_genres.is_empty());
        assert_eq!(state.selected_sort, DEFAULT_SORT);

        // 切回发现视图后参数仍在存储中
        adapter.set_view(BrowseView::Discover);
        assert_eq!(adapter.filter_state().search_term, "batman");
    }

    #[test]
    fn test_duplicate_patch_is_noop() {
        let store = MemoryQueryStore::new();
        store
            .patch(&[(KEY_SEARCH, Some("batman".to_string()))])
            .expect("Should write initial value");
        let result = store.patch(&[(KEY_SEARCH, Some("batman".to_string()))]);
        assert_eq!(result, Err(QueryStoreError::Duplicated));
    }

    #[test]
    fn test_backend_error_is_swallowed() {
        struct FailingStore {
            attempts: AtomicUsize,
        }

        impl QueryStore for FailingStore {
            fn get(&self, _key: &str) -> Option<QueryValue> {
                None
            }

            fn patch(&self, _updates: &[(&str, Option<String>)]) -> Result<(), QueryStoreError> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(QueryStoreError::Backend("store offline".to_string()))
            }
        }

        let adapter = FilterQueryAdapter::new(
            FailingStore {
                attempts: AtomicUsize::new(0),
            },
            BrowseView::Discover,
        );

        // 写入失败不会恐慌也不会传播
        adapter.set_search_term("batman");
        assert_eq!(adapter.store.attempts.load(Ordering::SeqCst), 1);
        assert!(adapter.filter_state().search_term.is_empty());
    }

    #[test]
    fn test_reset_clears_all_keys() {
        let adapter = FilterQueryAdapter::new(MemoryQueryStore::new(), BrowseView::Discover);
        adapter.set_search_term("batman");
        adapter.set_selected_genres(&[28]);
        adapter.set_selected_sort("title.asc");

        adapter.reset_filters();
        let state = adapter.filter_state();
        assert_eq!(state, FilterState::default());
    }
}
