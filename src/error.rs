// 浏览核心错误类型定义
//
// 定义了分页/筛选/排序核心中可能出现的各种错误类型

use thiserror::Error;

/// 浏览核心的统一错误类型
///
/// 所有变体只携带可克隆的数据，方便在累积引擎的状态快照中保留最近一次错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BrowseError {
    /// 输入无效（例如空的搜索词），在发起远程请求之前被拒绝
    #[error("无效的输入: {0}")]
    InvalidInput(String),

    /// 远程接口返回了非 2xx 状态码
    #[error("HTTP 错误: 状态码 {status}, {message}")]
    Http { status: u16, message: String },

    /// 响应结构与声明的数据模型不符
    #[error("响应解析失败: {0}")]
    Decode(String),

    /// 网络层错误（连接失败、DNS 等）
    #[error("网络错误: {0}")]
    Network(String),

    /// 等待加载条件超时
    #[error("加载超时")]
    Timeout,
}

impl BrowseError {
    /// 是否属于远程获取类错误（HTTP / 解析 / 网络）
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            BrowseError::Http { .. } | BrowseError::Decode(_) | BrowseError::Network(_)
        )
    }
}

// 实现从 reqwest::Error 到 BrowseError 的转换
impl From<reqwest::Error> for BrowseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrowseError::Timeout
        } else if err.is_decode() {
            BrowseError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BrowseError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            BrowseError::Network(err.to_string())
        }
    }
}
