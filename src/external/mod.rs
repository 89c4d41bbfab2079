// 外部接口模块
//
// 远程电影元数据资源的契约与实现

pub mod cache;
pub mod tmdb;

use async_trait::async_trait;

use crate::error::BrowseError;
use crate::models::{Genre, Movie, MovieListType, MoviePage};

/// 远程电影元数据资源的契约
///
/// 累积引擎只依赖这个 trait，测试中用内存实现替换真实客户端
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// 获取固定榜单的一页
    async fn fetch_list(&self, list_type: MovieListType, page: u32) -> Result<MoviePage, BrowseError>;

    /// 按文本查询搜索电影的一页
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, BrowseError>;

    /// 按排序键和类型集合发现电影的一页
    async fn discover_movies(
        &self,
        sort_by: Option<&str>,
        genres: &[u32],
        page: u32,
    ) -> Result<MoviePage, BrowseError>;

    /// 获取全部电影类型
    async fn fetch_genres(&self) -> Result<Vec<Genre>, BrowseError>;

    /// 获取单部电影详情
    async fn movie_details(&self, movie_id: u64) -> Result<Movie, BrowseError>;
}

pub use cache::MetadataCache;
pub use tmdb::{ImageSize, TmdbClient};
