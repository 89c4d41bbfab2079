// 服务模块

pub mod engine;
pub mod fetcher;
pub mod filtering;
pub mod query_state;
pub mod session;

pub use engine::{EngineSnapshot, FetchStatus, MovieAccumulator, LOAD_MORE_TIMEOUT, MIN_FILTERED_RESULTS, WIDEN_PAGE_BUDGET};
pub use fetcher::{FetchMode, PageFetcher};
pub use filtering::{compare_values, filter_and_sort, matches_genres, matches_search, sort_value, FilterOptions, SortValue};
pub use query_state::{BrowseView, FilterQueryAdapter, MemoryQueryStore, QueryStore, QueryStoreError, QueryValue};
pub use session::{derive_mode, fetch_key, BrowseSession};
