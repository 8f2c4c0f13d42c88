pub mod data;
pub mod mapping;

pub use data::{
    DeviceDocument, DeviceIdentity, IdentityObject, RegisterBank, RegisterValue,
    UnreadableRegister, register_patch,
};
pub use mapping::{AllField, DynamicMode, FieldMapping, MappingSchema};

use std::fmt;

/// Modbus 从站地址（unit identifier），同时作为设备文档的主键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u8);

impl UnitId {
    /// 文档 ID：从站地址的十进制字符串。
    pub fn document_id(&self) -> String {
        self.0.to_string()
    }
}

impl From<u8> for UnitId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
