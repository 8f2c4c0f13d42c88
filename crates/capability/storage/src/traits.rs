//! 存储接口 Trait 定义
//!
//! DocumentStore：文档存储适配器，仅由寄存器桥接层调用。
//!
//! 设计原则：
//! - “不存在”通过 `Option` / 结果枚举表达，不混入错误
//! - 其他失败统一返回 StorageError
//! - 使用 async_trait 支持动态分发（`Arc<dyn DocumentStore>`）

use crate::error::StorageError;
use crate::models::{CollectionRef, CreateOutcome, Document, UpdateOutcome};
use async_trait::async_trait;
use domain::MappingSchema;

/// 文档存储接口
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 索引是否存在
    async fn index_exists(&self, index: &str) -> Result<bool, StorageError>;

    /// 新建索引（已存在时返回错误）
    async fn create_index(&self, index: &str) -> Result<(), StorageError>;

    /// 在已有索引下新建集合
    async fn create_collection(&self, location: &CollectionRef) -> Result<(), StorageError>;

    /// 下发（覆盖）集合映射
    async fn update_mapping(
        &self,
        location: &CollectionRef,
        mapping: &MappingSchema,
    ) -> Result<(), StorageError>;

    /// 读取文档，不存在返回 `None`
    async fn get_document(
        &self,
        location: &CollectionRef,
        id: &str,
    ) -> Result<Option<Document>, StorageError>;

    /// 新建文档
    async fn create_document(
        &self,
        location: &CollectionRef,
        id: &str,
        body: &Document,
    ) -> Result<CreateOutcome, StorageError>;

    /// 局部合并更新，乐观并发冲突时最多重试 `retry_on_conflict` 次
    async fn update_document(
        &self,
        location: &CollectionRef,
        id: &str,
        patch: &Document,
        retry_on_conflict: u32,
    ) -> Result<UpdateOutcome, StorageError>;
}
