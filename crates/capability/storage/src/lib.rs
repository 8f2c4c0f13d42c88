//! # 文档存储模块
//!
//! 寄存器桥接层背后的文档存储适配器：每个 Modbus 从站对应一份文档，
//! 文档 ID 为从站地址字符串。
//!
//! ## 模块说明
//!
//! - [`traits`]：`DocumentStore` 接口（索引/集合/映射 + 文档 get/create/update）
//! - [`models`]：文档体、存储位置、更新/新建/初始化结果
//! - [`error`]：存储错误类型（不包含“不存在”与“冲突”，二者是显式结果）
//! - [`provision`]：启动初始化（索引、集合、映射）
//!
//! ### 存储实现
//!
//! - [`in_memory`]：内存存储实现
//!   - 使用 `RwLock<HashMap>` 保存带版本号的文档
//!   - 更新走乐观并发，冲突消耗重试预算
//!   - 适用于单元测试、集成测试和本地演示
//!
//! - [`redis`]：Redis 存储实现
//!   - 文档以 JSON 字符串保存
//!   - 新建使用 `SET NX`，更新使用 `WATCH` / `MULTI` / `EXEC`
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use regdoc_storage::{CollectionRef, InMemoryDocumentStore, prepare};
//! use domain::MappingSchema;
//!
//! let store = InMemoryDocumentStore::new();
//! let location = CollectionRef::new("modbus", "devices");
//! prepare(&store, &location, &MappingSchema::default()).await?;
//! ```

pub mod error;
pub mod in_memory;
pub mod models;
pub mod provision;
pub mod redis;
pub mod traits;

pub use error::*;
pub use in_memory::InMemoryDocumentStore;
pub use models::*;
pub use provision::prepare;
pub use self::redis::RedisDocumentStore;
pub use traits::*;
