// 电影浏览后端库
//
// 本库提供电影浏览的客户端侧核心功能，包括：
// - 分页累积引擎（去重合并、单在途请求、代数计数）
// - 筛选与排序求值
// - 查询参数状态适配
// - 远程元数据接口集成与缓存

pub mod error;
pub mod external;
pub mod models;
pub mod services;

pub use error::BrowseError;
