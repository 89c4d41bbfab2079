// 累积引擎 - 分页累积的核心状态机
//
// 职责：
// - 持有已获取页面的去重累积列表和分页进度
// - 提供 load / load_more / refresh / reset 四个操作
// - 用单个在途闸门保证同一时刻至多一个请求在途
// - 用代数计数器丢弃 reset 之后才返回的过期结果
// - 搜索与类型过滤同时激活时自动拓宽获取范围（有界预取）

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::BrowseError;
use crate::models::{FilterState, Movie, MoviePage};
use crate::services::fetcher::{FetchMode, PageFetcher};
use crate::services::filtering::{matches_genres, matches_search};

/// 组合模式下本地过滤结果的最小展示数量
pub const MIN_FILTERED_RESULTS: usize = 20;

/// 单次触发允许额外预取的页数上限
pub const WIDEN_PAGE_BUDGET: u32 = 5;

/// load_more 等待在途请求结束的时间上限
pub const LOAD_MORE_TIMEOUT: Duration = Duration::from_secs(5);

/// 引擎的获取状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    FetchingFirstPage,
    FetchingNextPage,
    Error,
}

/// 累积状态
///
/// 只能被引擎自身的操作修改；外部通过快照读取
#[derive(Debug)]
struct AccumState {
    movies: Vec<Movie>,
    seen_ids: HashSet<u64>,
    fetched_pages: HashSet<u32>,
    current_page: u32,
    total_pages: u32,
    total_results: u64,
    status: FetchStatus,
    error: Option<BrowseError>,
    generation: u64,
}

impl AccumState {
    fn new() -> Self {
        Self {
            movies: Vec::new(),
            seen_ids: HashSet::new(),
            fetched_pages: HashSet::new(),
            current_page: 1,
            total_pages: 0,
            total_results: 0,
            status: FetchStatus::Idle,
            error: None,
            generation: 0,
        }
    }

    /// 清空累积数据，代数保持不变
    fn clear(&mut self) {
        self.movies.clear();
        self.seen_ids.clear();
        self.fetched_pages.clear();
        self.current_page = 1;
        self.total_pages = 0;
        self.total_results = 0;
        self.error = None;
    }

    /// 把一页合并进累积列表
    ///
    /// 相同 id 只保留首次见到的实例，保持先取先排的顺序
    fn merge_page(&mut self, page_number: u32, page: MoviePage) {
        let fresh: Vec<Movie> = page
            .results
            .into_iter()
            .filter(|movie| self.seen_ids.insert(movie.id))
            .collect();
        self.movies.extend(fresh);
        self.fetched_pages.insert(page_number);
        self.total_pages = page.total_pages;
        self.total_results = page.total_results;
    }

    /// 失败后的状态归置：累积为空时进入 Error，否则回到 Idle 并保留好数据
    fn record_failure(&mut self, err: BrowseError) {
        self.status = if self.movies.is_empty() {
            FetchStatus::Error
        } else {
            FetchStatus::Idle
        };
        self.error = Some(err);
    }
}

/// 对外暴露的状态快照
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub movies: Vec<Movie>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub status: FetchStatus,
    pub error: Option<BrowseError>,
}

impl EngineSnapshot {
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::FetchingFirstPage
    }

    pub fn is_loading_more(&self) -> bool {
        self.status == FetchStatus::FetchingNextPage
    }
}

/// 累积引擎
///
/// 可克隆的句柄，克隆体共享同一份状态和在途闸门
#[derive(Clone)]
pub struct MovieAccumulator {
    fetcher: PageFetcher,
    state: Arc<RwLock<AccumState>>,
    fetch_gate: Arc<Mutex<()>>,
}

impl MovieAccumulator {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            state: Arc::new(RwLock::new(AccumState::new())),
            fetch_gate: Arc::new(Mutex::new(())),
        }
    }

    /// 搜索和类型过滤是否同时激活
    ///
    /// 远程搜索接口不接受类型约束，此时类型过滤只能在本地完成
    fn is_combined_mode(mode: FetchMode, filters: &FilterState) -> bool {
        mode == FetchMode::Search && !filters.selected_genres.is_empty()
    }

    /// 当前累积中通过搜索 + 类型双重过滤的条目数
    fn combined_filtered_count(state: &AccumState, filters: &FilterState) -> usize {
        let term = filters.normalized_search();
        state
            .movies
            .iter()
            .filter(|movie| {
                matches_search(movie, term) && matches_genres(movie, &filters.selected_genres)
            })
            .count()
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.read().await;
        EngineSnapshot {
            movies: state.movies.clone(),
            current_page: state.current_page,
            total_pages: state.total_pages,
            total_results: state.total_results,
            status: state.status,
            error: state.error.clone(),
        }
    }

    pub async fn has_more(&self) -> bool {
        let state = self.state.read().await;
        state.current_page < state.total_pages
    }

    /// 清空累积并递增代数，使仍在途的请求结果作废
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.clear();
        state.generation += 1;
        state.status = FetchStatus::Idle;
        debug!("engine reset, generation={}", state.generation);
    }

    /// 获取第一页，替换之前的全部累积
    ///
    /// 组合模式下成功后继续有界拓宽
    pub async fn load(&self, mode: FetchMode, filters: &FilterState) -> Result<(), BrowseError> {
        let _guard = self.fetch_gate.lock().await;

        let my_generation = {
            let mut state = self.state.write().await;
            state.status = FetchStatus::FetchingFirstPage;
            state.error = None;
            state.generation
        };

        match self.fetcher.fetch_page(mode, filters, 1).await {
            Ok(page) => {
                {
                    let mut state = self.state.write().await;
                    if state.generation != my_generation {
                        debug!("discarding stale first page, superseded generation");
                        return Ok(());
                    }
                    state.clear();
                    state.merge_page(1, page);
                    state.current_page = 1;
                    state.status = FetchStatus::Idle;
                }
                if Self::is_combined_mode(mode, filters) {
                    self.widen(mode, filters, my_generation).await?;
                }
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.write().await;
                if state.generation == my_generation {
                    warn!("first page fetch failed: {}", err);
                    state.record_failure(err.clone());
                }
                Err(err)
            }
        }
    }

    /// 获取下一页并合并
    ///
    /// 没有更多页、目标页已取过或被重复触发时为无操作；
    /// 等待在途请求超过时间上限时返回超时错误且不改动状态；
    /// 页码推进是临时的，获取失败时回滚
    pub async fn load_more(
        &self,
        mode: FetchMode,
        filters: &FilterState,
    ) -> Result<bool, BrowseError> {
        let _guard = timeout(LOAD_MORE_TIMEOUT, self.fetch_gate.lock())
            .await
            .map_err(|_| BrowseError::Timeout)?;

        let (my_generation, next_page) = {
            let mut state = self.state.write().await;
            if state.total_pages == 0 || state.current_page >= state.total_pages {
                return Ok(false);
            }
            let next_page = state.current_page + 1;
            if state.fetched_pages.contains(&next_page) {
                // 重复触发同一页码是无操作
                return Ok(false);
            }
            state.status = FetchStatus::FetchingNextPage;
            state.error = None;
            // 临时推进页码，失败时回滚
            state.current_page = next_page;
            (state.generation, next_page)
        };

        match self.fetcher.fetch_page(mode, filters, next_page).await {
            Ok(page) => {
                {
                    let mut state = self.state.write().await;
                    if state.generation != my_generation {
                        debug!("discarding stale page {}, superseded generation", next_page);
                        return Ok(false);
                    }
                    state.merge_page(next_page, page);
                    state.status = FetchStatus::Idle;
                }
                if Self::is_combined_mode(mode, filters) {
                    self.widen(mode, filters, my_generation).await?;
                }
                Ok(true)
            }
            Err(err) => {
                let mut state = self.state.write().await;
                if state.generation == my_generation {
                    warn!("page {} fetch failed: {}", next_page, err);
                    state.current_page = next_page - 1;
                    state.status = FetchStatus::Idle;
                    state.error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// 并发重取所有已获取过的页面并在一次遍历中重建累积
    ///
    /// 页码互不相同且在发起前已确定，因此允许并发；
    /// 尚未获取过任何页面时等价于 load
    pub async fn refresh(&self, mode: FetchMode, filters: &FilterState) -> Result<(), BrowseError> {
        let mut pages: Vec<u32> = {
            let state = self.state.read().await;
            state.fetched_pages.iter().copied().collect()
        };
        if pages.is_empty() {
            return self.load(mode, filters).await;
        }
        pages.sort_unstable();

        let _guard = self.fetch_gate.lock().await;

        let my_generation = {
            let mut state = self.state.write().await;
            state.status = FetchStatus::FetchingFirstPage;
            state.error = None;
            state.generation
        };

        match self.fetcher.fetch_pages(mode, filters, &pages).await {
            Ok(responses) => {
                let mut state = self.state.write().await;
                if state.generation != my_generation {
                    return Ok(());
                }
                let highest = pages.last().copied().unwrap_or(1);
                state.clear();
                for response in responses {
                    let page_number = response.page;
                    state.merge_page(page_number, response);
                }
                state.current_page = highest.min(state.total_pages.max(1));
                state.status = FetchStatus::Idle;
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.write().await;
                if state.generation == my_generation {
                    warn!("refresh failed: {}", err);
                    state.record_failure(err.clone());
                }
                Err(err)
            }
        }
    }

    /// 组合模式的有界拓宽
    ///
    /// 每取回一页就重新评估本地过滤后的数量，直到数量达标、
    /// 没有更多远程页面或预取预算耗尽为止；页与页之间顺序执行，
    /// 保证 total_pages 和 seen_ids 在每一步之间一致。
    /// 调用方必须已持有在途闸门
    async fn widen(
        &self,
        mode: FetchMode,
        filters: &FilterState,
        my_generation: u64,
    ) -> Result<(), BrowseError> {
        let mut extra_fetched: u32 = 0;

        loop {
            let next_page = {
                let state = self.state.read().await;
                if state.generation != my_generation {
                    return Ok(());
                }
                if Self::combined_filtered_count(&state, filters) >= MIN_FILTERED_RESULTS {
                    return Ok(());
                }
                if state.current_page >= state.total_pages {
                    return Ok(());
                }
                if extra_fetched >= WIDEN_PAGE_BUDGET {
                    debug!("widen budget exhausted after {} pages", extra_fetched);
                    return Ok(());
                }
                state.current_page + 1
            };

            match self.fetcher.fetch_page(mode, filters, next_page).await {
                Ok(page) => {
                    let mut state = self.state.write().await;
                    if state.generation != my_generation {
                        return Ok(());
                    }
                    state.merge_page(next_page, page);
                    state.current_page = next_page;
                    extra_fetched += 1;
                }
                Err(err) => {
                    // 已合并的页面保持有效，错误交给触发方
                    let mut state = self.state.write().await;
                    if state.generation == my_generation {
                        warn!("widen fetch for page {} failed: {}", next_page, err);
                        state.status = FetchStatus::Idle;
                        state.error = Some(err.clone());
                    }
                    return Err(err);
                }
            }
        }
    }
}
