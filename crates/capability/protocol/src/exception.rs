//! 桥接错误 → Modbus 异常码

use regdoc_bridge::BridgeError;
use tokio_modbus::prelude::ExceptionCode;

/// 把桥接层失败映射为总线异常码。
///
/// 超时与冲突耗尽属于暂时性失败，主站稍后重试即可，返回 `ServerDeviceBusy`；
/// 地址越界返回 `IllegalDataAddress`；其余一律 `ServerDeviceFailure`。
pub fn exception_for(err: &BridgeError) -> ExceptionCode {
    match err {
        BridgeError::AddressRange { .. } => ExceptionCode::IllegalDataAddress,
        err if err.is_transient() => ExceptionCode::ServerDeviceBusy,
        _ => ExceptionCode::ServerDeviceFailure,
    }
}
