//! 内存存储实现模块
//!
//! 仅用于本地演示和测试。
//!
//! 包含以下实现：
//! - DocumentStore: InMemoryDocumentStore

pub mod document;

pub use document::*;
