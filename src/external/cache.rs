// 元数据缓存
//
// 类型目录和电影详情的进程内缓存：
// - 类型目录缓存 1 小时（整个会话期间基本不变）
// - 详情缓存 2 小时
// 列表/搜索/发现的分页响应不缓存，由累积引擎自己持有

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::error::BrowseError;
use crate::external::MovieApi;
use crate::models::{Genre, Movie};

/// 类型目录缓存时长
const GENRES_TTL: Duration = Duration::from_secs(60 * 60);

/// 详情缓存时长
const DETAILS_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// 详情缓存容量上限
const DETAILS_CAPACITY: u64 = 512;

/// 面向 MovieApi 的读穿缓存
pub struct MetadataCache {
    api: Arc<dyn MovieApi>,
    genres: Cache<(), Arc<Vec<Genre>>>,
    details: Cache<u64, Arc<Movie>>,
}

impl MetadataCache {
    pub fn new(api: Arc<dyn MovieApi>) -> Self {
        Self {
            api,
            genres: Cache::builder()
                .max_capacity(1)
                .time_to_live(GENRES_TTL)
                .build(),
            details: Cache::builder()
                .max_capacity(DETAILS_CAPACITY)
                .time_to_live(DETAILS_TTL)
                .build(),
        }
    }

    /// 获取类型目录，未命中时回源并写入缓存
    ///
    /// 回源失败不缓存，下次调用重新尝试
    pub async fn genres(&self) -> Result<Arc<Vec<Genre>>, BrowseError> {
        if let Some(cached) = self.genres.get(&()).await {
            return Ok(cached);
        }
        let fetched = Arc::new(self.api.fetch_genres().await?);
        self.genres.insert((), fetched.clone()).await;
        Ok(fetched)
    }

    /// 获取电影详情，未命中时回源并写入缓存
    pub async fn movie_details(&self, movie_id: u64) -> Result<Arc<Movie>, BrowseError> {
        if let Some(cached) = self.details.get(&movie_id).await {
            return Ok(cached);
        }
        let fetched = Arc::new(self.api.movie_details(movie_id).await?);
        self.details.insert(movie_id, fetched.clone()).await;
        Ok(fetched)
    }

    /// 清空全部缓存条目
    pub async fn clear(&self) {
        self.genres.invalidate_all();
        self.details.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieListType, MoviePage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        genre_calls: AtomicUsize,
        detail_calls: AtomicUsize,
    }

    impl CountingApi {
        fn new() -> Self {
            Self {
                genre_calls: AtomicUsize::new(0),
                detail_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MovieApi for CountingApi {
        async fn fetch_list(
            &self,
            _list_type: MovieListType,
            _page: u32,
        ) -> Result<MoviePage, BrowseError> {
            unimplemented!("not used in cache tests")
        }

        async fn search_movies(&self, _query: &str, _page: u32) -> Result<MoviePage, BrowseError> {
            unimplemented!("not used in cache tests")
        }

        async fn discover_movies(
            &self,
            _sort_by: Option<&str>,
            _genres: &[u32],
            _page: u32,
        ) -> Result<MoviePage, BrowseError> {
            unimplemented!("not used in cache tests")
        }

        async fn fetch_genres(&self) -> Result<Vec<Genre>, BrowseError> {
            self.genre_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Genre {
                id: 28,
                name: "Action".to_string(),
            }])
        }

        async fn movie_details(&self, movie_id: u64) -> Result<Movie, BrowseError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_value(serde_json::json!({
                "id": movie_id,
                "title": "Cached Movie",
                "original_title": "Cached Movie",
            }))
            .expect("Should build test movie"))
        }
    }

    #[tokio::test]
    async fn test_genres_fetched_once() {
        let api = Arc::new(CountingApi::new());
        let cache = MetadataCache::new(api.clone());

        let first = cache.genres().await.expect("Should fetch genres");
        let second = cache.genres().await.expect("Should hit cache");
        assert_eq!(first, second);
        assert_eq!(api.genre_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_details_cached_per_id() {
        let api = Arc::new(CountingApi::new());
        let cache = MetadataCache::new(api.clone());

        cache.movie_details(1).await.expect("Should fetch details");
        cache.movie_details(1).await.expect("Should hit cache");
        cache.movie_details(2).await.expect("Should fetch details");
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_invalidates() {
        let api = Arc::new(CountingApi::new());
        let cache = MetadataCache::new(api.clone());

        cache.genres().await.expect("Should fetch genres");
        cache.clear().await;
        // moka 的失效是异步生效的，给后台任务让出执行机会
        tokio::task::yield_now().await;
        cache.genres().await.expect("Should refetch genres");
        assert!(api.genre_calls.load(Ordering::SeqCst) >= 2);
    }
}
