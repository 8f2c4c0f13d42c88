//! 设备集合的字段映射描述（schema descriptor）。
//!
//! 每次启动都会重新下发，序列化结构与存储端的映射声明一致：
//!
//! ```json
//! {
//!   "dynamic": "strict",
//!   "_all": { "enabled": false },
//!   "properties": {
//!     "holding": { "type": "nested", "dynamic": "false",
//!                  "properties": { "addr": { "type": "long" },
//!                                  "value": { "type": "long", "index": false } } },
//!     "vendor": { "type": "text" }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{IdentityObject, RegisterBank};

/// 未声明字段的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicMode {
    /// 拒绝未声明字段
    Strict,
    #[serde(rename = "true")]
    Enabled,
    #[serde(rename = "false")]
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllField {
    pub enabled: bool,
}

/// 单个字段的映射。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<DynamicMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, FieldMapping>>,
}

impl FieldMapping {
    pub fn scalar(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            dynamic: None,
            index: None,
            properties: None,
        }
    }

    /// 寄存器区：nested 的 `addr` / `value` 对，value 不建索引。
    pub fn register_bank() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("addr".to_string(), Self::scalar("long"));
        properties.insert(
            "value".to_string(),
            Self {
                index: Some(false),
                ..Self::scalar("long")
            },
        );
        Self {
            kind: "nested".to_string(),
            dynamic: Some(DynamicMode::Disabled),
            index: None,
            properties: Some(properties),
        }
    }
}

/// 集合映射描述。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSchema {
    pub dynamic: DynamicMode,
    #[serde(rename = "_all", default, skip_serializing_if = "Option::is_none")]
    pub all: Option<AllField>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldMapping>,
}

impl Default for MappingSchema {
    fn default() -> Self {
        let mut properties = BTreeMap::new();
        for bank in RegisterBank::ALL {
            properties.insert(bank.as_str().to_string(), FieldMapping::register_bank());
        }
        for object in IdentityObject::ALL {
            let kind = match object {
                IdentityObject::ProductCode | IdentityObject::MajorMinorRevision => "keyword",
                _ => "text",
            };
            properties.insert(object.field().to_string(), FieldMapping::scalar(kind));
        }
        Self {
            dynamic: DynamicMode::Strict,
            all: Some(AllField { enabled: false }),
            properties,
        }
    }
}

impl MappingSchema {
    /// strict 模式下返回不在映射中的顶层字段。
    pub fn undeclared_fields<'a, I>(&self, fields: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        if self.dynamic != DynamicMode::Strict {
            return Vec::new();
        }
        fields
            .into_iter()
            .filter(|field| !self.properties.contains_key(field.as_str()))
            .cloned()
            .collect()
    }
}
