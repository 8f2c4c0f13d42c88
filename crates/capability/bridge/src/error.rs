//! 桥接层错误类型定义

use domain::{UnitId, UnreadableRegister};
use regdoc_storage::StorageError;

/// 桥接层错误
///
/// 只在“确实没有数据”时返回缺省值；其余失败原样上抛给协议层，
/// 由协议层决定总线上的异常码。
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// 存储错误（连接、权限、后端等）
    #[error("store error: {0}")]
    Store(#[from] StorageError),

    /// 冲突重试预算耗尽
    #[error("device {unit}: update conflict not resolved after {attempts} attempts")]
    ConflictExhausted { unit: UnitId, attempts: u32 },

    /// 首写竞争后文档又消失
    #[error("device {unit}: document vanished during upsert")]
    Vanished { unit: UnitId },

    /// 被请求地址上的内容无法解释为寄存器值
    #[error("device {unit}: unreadable register: {source}")]
    UnreadableRegister {
        unit: UnitId,
        #[source]
        source: UnreadableRegister,
    },

    /// 地址区间越过 65535
    #[error("address range {addr}+{count} out of bounds")]
    AddressRange { addr: u16, count: u16 },

    /// 存储调用超时
    #[error("store call timed out after {0} ms")]
    Timeout(u64),

    /// 协议不支持的操作（前置条件错误）
    #[error("precondition failed: {0}")]
    Precondition(&'static str),
}

impl BridgeError {
    /// 是否为可重试的瞬时失败（超时、冲突）。
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConflictExhausted { .. })
    }
}
