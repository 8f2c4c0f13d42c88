//! 存储层错误类型
//!
//! “文档不存在”与“并发冲突”不属于错误，由 [`crate::models::UpdateOutcome`]
//! 与 [`crate::models::CreateOutcome`] 显式表达；这里只包含需要原样上抛的失败：
//! - 连接错误
//! - 序列化错误
//! - 后端执行错误
//! - 映射校验失败

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 连接错误（拒绝连接、连接断开、IO）
    #[error("connection error: {0}")]
    Connection(String),

    /// 文档或映射序列化错误
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 后端执行错误（索引/集合不存在、锁失败等）
    #[error("backend error: {0}")]
    Backend(String),

    /// strict 映射下写入了未声明字段
    #[error("mapping violation on {collection}: undeclared fields {fields:?}")]
    MappingViolation {
        collection: String,
        fields: Vec<String>,
    },
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            Self::Connection(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}
