pub mod http;
pub mod memory;

pub use http::{ApiClient, ApiConfig, HttpCollection};
pub use memory::MemoryCollection;

use crate::error::ApiError;
use crate::model::RecordId;

/// 远程集合服务 - 对一个资源集合的增删改查
///
/// 所有失败都以 [`ApiError`] 返回，由调用方决定如何提示，服务本身不重试。
pub trait CollectionService {
    type Item;
    type Draft;

    /// 集合在接口中的路径名
    fn collection(&self) -> &'static str;

    fn list(&self) -> Result<Vec<Self::Item>, ApiError>;

    /// 记录不存在时返回 `Ok(None)`
    fn get(&self, id: RecordId) -> Result<Option<Self::Item>, ApiError>;

    fn create(&self, draft: &Self::Draft) -> Result<Self::Item, ApiError>;

    fn update(&self, id: RecordId, draft: &Self::Draft) -> Result<Self::Item, ApiError>;

    fn delete(&self, id: RecordId) -> Result<(), ApiError>;
}
