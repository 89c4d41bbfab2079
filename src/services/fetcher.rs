// 页面获取器
//
// 根据模式（榜单/搜索/发现）和页码构建请求描述并调用远程资源。
// 任何一层都不做自动重试，失败原样交给调用方决定是否重新发起

use std::sync::Arc;

use tracing::debug;

use crate::error::BrowseError;
use crate::external::{tmdb::MAX_PAGE, MovieApi};
use crate::models::{FilterState, MovieListType, MoviePage};

/// 获取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// 固定榜单，仅服务端分页
    List(MovieListType),
    /// 自由文本搜索，服务端不支持类型过滤
    Search,
    /// 服务端类型 + 排序查询
    Discover,
}

impl FetchMode {
    /// 筛选键中使用的模式标签
    pub fn tag(&self) -> String {
        match self {
            FetchMode::List(list_type) => format!("list:{}", list_type.as_str()),
            FetchMode::Search => "search".to_string(),
            FetchMode::Discover => "discover".to_string(),
        }
    }
}

/// 页面获取器
///
/// 可克隆的轻量句柄，内部共享同一个远程客户端
#[derive(Clone)]
pub struct PageFetcher {
    api: Arc<dyn MovieApi>,
}

impl PageFetcher {
    pub fn new(api: Arc<dyn MovieApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> Arc<dyn MovieApi> {
        self.api.clone()
    }

    /// 获取指定模式下的一页
    pub async fn fetch_page(
        &self,
        mode: FetchMode,
        filters: &FilterState,
        page: u32,
    ) -> Result<MoviePage, BrowseError> {
        if page == 0 || page > MAX_PAGE {
            return Err(BrowseError::InvalidInput(format!(
                "页码 {} 超出允许范围 1..={}",
                page, MAX_PAGE
            )));
        }
        debug!("fetch_page mode={} page={}", mode.tag(), page);
        match mode {
            FetchMode::List(list_type) => self.api.fetch_list(list_type, page).await,
            FetchMode::Search => {
                let query = filters.normalized_search();
                if query.is_empty() {
                    return Err(BrowseError::InvalidInput(
                        "搜索词为空，无法发起搜索请求".to_string(),
                    ));
                }
                self.api.search_movies(query, page).await
            }
            FetchMode::Discover => {
                let sort_by = if filters.is_default_sort() {
                    None
                } else {
                    Some(filters.selected_sort.as_str())
                };
                self.api
                    .discover_movies(sort_by, &filters.selected_genres, page)
                    .await
            }
        }
    }

    /// 并发获取一组互不相同的预定页码，按页码顺序返回结果
    ///
    /// 页码在发起前已经确定，各任务之间没有共享可变状态，
    /// 全部完成后才在一次遍历中合并，这是允许并发的唯一场景
    pub async fn fetch_pages(
        &self,
        mode: FetchMode,
        filters: &FilterState,
        pages: &[u32],
    ) -> Result<Vec<MoviePage>, BrowseError> {
        let mut handles = Vec::with_capacity(pages.len());
        for &page in pages {
            let fetcher = self.clone();
            let filters = filters.clone();
            handles.push(tokio::spawn(async move {
                fetcher.fetch_page(mode, &filters, page).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let page = handle
                .await
                .map_err(|err| BrowseError::Network(err.to_string()))??;
            results.push(page);
        }
        results.sort_by_key(|page| page.page);
        Ok(results)
    }
}
