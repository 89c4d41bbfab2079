// 筛选状态模型
//
// 定义了搜索词、类型集合和排序键组成的筛选状态，
// 以及排序键的解析规则和各种默认值/阈值常量

use serde::{Deserialize, Serialize};

/// 默认排序键
pub const DEFAULT_SORT: &str = "popularity.desc";

/// 搜索词触发远程搜索所需的最小长度（去除首尾空白后）
pub const MIN_SEARCH_LENGTH: usize = 2;

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// 解析后的排序规格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// 解析 `"<field>.<asc|desc>"` 形式的排序键
///
/// 没有可识别的方向后缀时返回 None，调用方应保持列表原序而不报错
pub fn parse_sort(key: &str) -> Option<SortSpec> {
    let (field, direction) = key.rsplit_once('.')?;
    if field.is_empty() {
        return None;
    }
    let direction = match direction {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        _ => return None,
    };
    Some(SortSpec {
        field: field.to_string(),
        direction,
    })
}

/// 筛选状态
///
/// `selected_genres` 保持插入顺序但语义上是集合（比较键时先排序）；
/// `selected_sort` 恒为 `"<field>.<asc|desc>"` 形式，缺省为 `popularity.desc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_term: String,
    pub selected_genres: Vec<u32>,
    pub selected_sort: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            selected_genres: Vec::new(),
            selected_sort: DEFAULT_SORT.to_string(),
        }
    }
}

impl FilterState {
    /// 规范化后的搜索词：达到最小长度阈值时返回去除空白的词，否则为空
    ///
    /// 低于阈值的输入仅用于展示，不触发任何搜索请求
    pub fn normalized_search(&self) -> &str {
        let trimmed = self.search_term.trim();
        if trimmed.len() >= MIN_SEARCH_LENGTH {
            trimmed
        } else {
            ""
        }
    }

    /// 搜索是否处于激活状态
    pub fn has_active_search(&self) -> bool {
        !self.normalized_search().is_empty()
    }

    /// 排序键是否为默认值
    pub fn is_default_sort(&self) -> bool {
        self.selected_sort == DEFAULT_SORT
    }

    /// 是否存在任何激活的筛选条件
    pub fn has_active_filters(&self) -> bool {
        !self.search_term.is_empty() || !self.selected_genres.is_empty() || !self.is_default_sort()
    }

    /// 类型 ID 的排序副本，用于构造与顺序无关的筛选键
    pub fn sorted_genres(&self) -> Vec<u32> {
        let mut genres = self.selected_genres.clone();
        genres.sort_unstable();
        genres.dedup();
        genres
    }
}
