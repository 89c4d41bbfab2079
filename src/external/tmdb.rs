// TMDB API 客户端
//
// 通过 reqwest 访问远程元数据资源，请求参数经由查询序列化器编码。
// 响应在边界上直接反序列化为声明的结构，结构不符即为获取错误

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::BrowseError;
use crate::external::MovieApi;
use crate::models::{Genre, GenresResponse, Movie, MovieListType, MoviePage};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_DEFAULT_LANGUAGE: &str = "en-US";

/// TMDB 允许的最大页码
pub const MAX_PAGE: u32 = 1000;

/// TMDB API 客户端
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: TMDB_BASE_URL.to_string(),
        }
    }

    /// 覆盖基础地址，测试时指向本地服务
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// 发送请求并在边界上完成状态码检查与结构校验
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BrowseError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} params={:?}", path, params);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", TMDB_DEFAULT_LANGUAGE)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BrowseError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| BrowseError::Decode(err.to_string()))
    }

    /// 构建图片 URL
    pub fn build_image_url(&self, path: &str, size: ImageSize) -> String {
        format!("https://image.tmdb.org/t/p/{}{}", size.as_str(), path)
    }
}

#[async_trait]
impl MovieApi for TmdbClient {
    async fn fetch_list(
        &self,
        list_type: MovieListType,
        page: u32,
    ) -> Result<MoviePage, BrowseError> {
        let path = format!("movie/{}", list_type.as_str());
        self.get_json(&path, &[("page", page.to_string())]).await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, BrowseError> {
        if query.trim().is_empty() {
            return Err(BrowseError::InvalidInput(
                "搜索词不能为空".to_string(),
            ));
        }
        self.get_json(
            "search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn discover_movies(
        &self,
        sort_by: Option<&str>,
        genres: &[u32],
        page: u32,
    ) -> Result<MoviePage, BrowseError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(sort) = sort_by {
            params.push(("sort_by", sort.to_string()));
        }
        if !genres.is_empty() {
            let joined = genres
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            params.push(("with_genres", joined));
        }
        params.push(("page", page.to_string()));

        self.get_json("discover/movie", &params).await
    }

    async fn fetch_genres(&self) -> Result<Vec<Genre>, BrowseError> {
        let response: GenresResponse = self.get_json("genre/movie/list", &[]).await?;
        Ok(response.genres)
    }

    async fn movie_details(&self, movie_id: u64) -> Result<Movie, BrowseError> {
        let path = format!("movie/{}", movie_id);
        self.get_json(&path, &[]).await
    }
}

/// 图片尺寸枚举
#[derive(Debug, Clone, Copy)]
pub enum ImageSize {
    W92,
    W154,
    W185,
    W342,
    W500,
    W780,
    Original,
}

impl ImageSize {
    fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W92 => "w92",
            ImageSize::W154 => "w154",
            ImageSize::W185 => "w185",
            ImageSize::W342 => "w342",
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::Original => "original",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_image_url() {
        let client = TmdbClient::new("key".to_string());
        assert_eq!(
            client.build_image_url("/poster.jpg", ImageSize::W500),
            "https://image.tmdb.org/t/p/w500/poster.jpg"
        );
        assert_eq!(
            client.build_image_url("/backdrop.jpg", ImageSize::Original),
            "https://image.tmdb.org/t/p/original/backdrop.jpg"
        );
    }

    #[tokio::test]
    async fn test_empty_search_rejected_before_remote_call() {
        // base_url 指向不存在的地址：空查询必须在发请求之前就被拒绝
        let client =
            TmdbClient::with_base_url("key".to_string(), "http://127.0.0.1:1".to_string());
        let result = client.search_movies("   ", 1).await;
        assert!(matches!(result, Err(BrowseError::InvalidInput(_))));
    }
}
