// 浏览会话 - 模式/触发协调器与对外接口
//
// 观察筛选状态的变化并计算获取相关键：键变了就重置累积引擎并
// 重新获取，键没变就只做本地重过滤。向上暴露累积列表、加载状态、
// 错误和 load_more / refresh / reset 操作

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::BrowseError;
use crate::external::{MetadataCache, MovieApi};
use crate::models::{FilterState, Genre, Movie};
use crate::services::engine::{EngineSnapshot, MovieAccumulator};
use crate::services::fetcher::{FetchMode, PageFetcher};
use crate::services::filtering::{filter_and_sort, FilterOptions};
use crate::services::query_state::{BrowseView, FilterQueryAdapter, QueryStore};

/// 由视图和筛选状态推导当前的获取模式
///
/// 发现视图上激活的搜索词把模式切到搜索；低于长度阈值的搜索词
/// 视为未激活，仍然走发现模式
pub fn derive_mode(view: BrowseView, filters: &FilterState) -> FetchMode {
    match view {
        BrowseView::List(list_type) => FetchMode::List(list_type),
        BrowseView::Discover => {
            if filters.has_active_search() {
                FetchMode::Search
            } else {
                FetchMode::Discover
            }
        }
    }
}

/// 计算获取相关键：筛选状态中会使已累积页面失效的最小投影
///
/// 排序键只在发现模式下参与（榜单/搜索模式的远程接口不支持排序，
/// 排序纯属本地操作，不应触发重取）
pub fn fetch_key(mode: FetchMode, filters: &FilterState) -> String {
    let genres = filters
        .sorted_genres()
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let sort = match mode {
        FetchMode::Discover => filters.selected_sort.as_str(),
        _ => "",
    };
    format!(
        "{}|{}|{}|{}",
        mode.tag(),
        filters.normalized_search(),
        genres,
        sort
    )
}

/// 浏览会话
///
/// 显式构造、按引用传递的实例，没有进程级单例
pub struct BrowseSession<S: QueryStore> {
    filters: FilterQueryAdapter<S>,
    engine: MovieAccumulator,
    metadata: MetadataCache,
    last_key: Mutex<Option<String>>,
}

impl<S: QueryStore> BrowseSession<S> {
    pub fn new(api: Arc<dyn MovieApi>, store: S, view: BrowseView) -> Self {
        Self {
            filters: FilterQueryAdapter::new(store, view),
            engine: MovieAccumulator::new(PageFetcher::new(api.clone())),
            metadata: MetadataCache::new(api),
            last_key: Mutex::new(None),
        }
    }

    pub fn filter_state(&self) -> FilterState {
        self.filters.filter_state()
    }

    pub fn view(&self) -> BrowseView {
        self.filters.view()
    }

    fn current_mode(&self) -> FetchMode {
        derive_mode(self.filters.view(), &self.filters.filter_state())
    }

    /// 将当前筛选状态与引擎对齐
    ///
    /// 获取相关键没变时不做任何事；变了就重置并后台重新获取，
    /// 获取失败不向外传播，错误保留在引擎状态里供读取
    pub async fn sync(&self) -> bool {
        let filters = self.filters.filter_state();
        let mode = derive_mode(self.filters.view(), &filters);
        let key = fetch_key(mode, &filters);

        let mut last_key = self.last_key.lock().await;
        if last_key.as_deref() == Some(key.as_str()) {
            return false;
        }
        debug!("fetch key changed: {:?} -> {}", last_key.as_deref(), key);
        *last_key = Some(key);
        drop(last_key);

        self.engine.reset().await;
        if let Err(err) = self.engine.load(mode, &filters).await {
            // 后台触发的获取错误只记录，不传播
            warn!("background load failed: {}", err);
        }
        true
    }

    /// 切换视图并对齐
    pub async fn set_view(&self, view: BrowseView) {
        self.filters.set_view(view);
        self.sync().await;
    }

    pub async fn set_search_term(&self, value: &str) {
        self.filters.set_search_term(value);
        self.sync().await;
    }

    pub async fn set_selected_genres(&self, genres: &[u32]) {
        self.filters.set_selected_genres(genres);
        self.sync().await;
    }

    pub async fn set_selected_sort(&self, sort: &str) {
        self.filters.set_selected_sort(sort);
        self.sync().await;
    }

    /// 当前应展示的电影列表：累积快照之上应用本地筛选与排序
    ///
    /// 榜单视图不持有筛选参数，累积列表按服务端顺序原样返回；
    /// 发现模式（无激活搜索）下排序已由远程接口完成，跳过本地排序
    pub async fn movies(&self) -> Vec<Movie> {
        let filters = self.filters.filter_state();
        let mode = self.current_mode();
        let snapshot = self.engine.snapshot().await;

        if matches!(self.filters.view(), BrowseView::List(_)) {
            return snapshot.movies;
        }

        let options = FilterOptions {
            search_term: filters.normalized_search(),
            active_search: filters.has_active_search(),
            selected_genres: &filters.selected_genres,
            selected_sort: &filters.selected_sort,
            sort_eligible: mode != FetchMode::Discover,
        };
        filter_and_sort(snapshot.movies, &options)
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.engine.snapshot().await
    }

    pub async fn is_loading(&self) -> bool {
        self.engine.snapshot().await.is_loading()
    }

    pub async fn is_loading_more(&self) -> bool {
        self.engine.snapshot().await.is_loading_more()
    }

    pub async fn error(&self) -> Option<BrowseError> {
        self.engine.snapshot().await.error
    }

    pub async fn has_more(&self) -> bool {
        self.engine.has_more().await
    }

    /// 显式加载下一页；错误向调用方传播以便决定重试
    pub async fn load_more(&self) -> Result<bool, BrowseError> {
        let filters = self.filters.filter_state();
        let mode = derive_mode(self.filters.view(), &filters);
        self.engine.load_more(mode, &filters).await
    }

    /// 显式重取当前窗口；错误向调用方传播
    pub async fn refresh(&self) -> Result<(), BrowseError> {
        let filters = self.filters.filter_state();
        let mode = derive_mode(self.filters.view(), &filters);
        self.engine.refresh(mode, &filters).await
    }

    /// 重置累积状态并重新获取
    ///
    /// `full` 为真时同时清空持久化的筛选参数
    pub async fn reset(&self, full: bool) {
        if full {
            self.filters.reset_filters();
            self.metadata.clear().await;
        }
        {
            // 强制下一次 sync 视为键变化
            let mut last_key = self.last_key.lock().await;
            *last_key = None;
        }
        self.engine.reset().await;
        self.sync().await;
    }

    /// 类型目录，带缓存；失败记录日志并返回空列表
    pub async fn genres(&self) -> Vec<Genre> {
        match self.metadata.genres().await {
            Ok(genres) => genres.as_ref().clone(),
            Err(err) => {
                warn!("genre catalog fetch failed: {}", err);
                Vec::new()
            }
        }
    }

    /// 单部电影详情，带缓存
    pub async fn movie_details(&self, movie_id: u64) -> Result<Arc<Movie>, BrowseError> {
        self.metadata.movie_details(movie_id).await
    }
}
