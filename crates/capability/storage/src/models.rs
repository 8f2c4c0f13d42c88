//! 数据模型
//!
//! - 文档体：Document（JSON 对象）
//! - 存储位置：CollectionRef（index + collection）
//! - 写入结果：UpdateOutcome、CreateOutcome、ProvisionOutcome

use serde_json::{Map, Value};
use std::fmt;

/// 原始文档体 / 局部更新体。
pub type Document = Map<String, Value>;

/// 文档所在的索引与集合。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub index: String,
    pub collection: String,
}

impl CollectionRef {
    pub fn new(index: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.collection)
    }
}

/// 局部更新结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 更新成功，`attempts` 为实际尝试次数（1 表示首次即成功）
    Updated { attempts: u32 },
    /// 目标文档不存在
    NotFound,
    /// 冲突重试预算耗尽
    Conflict { attempts: u32 },
}

/// 新建文档结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// 同 ID 文档已存在（并发首写竞争失败）
    AlreadyExists,
}

/// 启动初始化结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// 索引与集合为本次新建
    Created,
    /// 索引已存在，仅重新下发映射
    AlreadyPresent,
}

/// 递归合并：对象逐键合并，其余值直接覆盖。
pub fn merge_document(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_document(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
