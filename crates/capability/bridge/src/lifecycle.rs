//! 协议生命周期与实时通道接口。
//!
//! Modbus 是纯请求/应答的轮询协议，没有会话与推送：断开、广播、通知、
//! 加入/离开频道一律以前置条件错误返回，不会静默成功。

use crate::error::BridgeError;
use serde_json::Value;

/// 协议入口需要提供的生命周期与实时能力。
pub trait ProtocolLifecycle {
    /// 主动断开某个连接
    fn disconnect(&self, connection_id: &str) -> Result<(), BridgeError>;

    /// 向频道广播
    fn broadcast(&self, channels: &[String], payload: &Value) -> Result<(), BridgeError>;

    /// 向某个连接推送频道通知
    fn notify(
        &self,
        channels: &[String],
        connection_id: &str,
        payload: &Value,
    ) -> Result<(), BridgeError>;

    /// 连接加入频道
    fn join_channel(&self, channel: &str, connection_id: &str) -> Result<(), BridgeError>;

    /// 连接离开频道
    fn leave_channel(&self, channel: &str, connection_id: &str) -> Result<(), BridgeError>;
}

/// 轮询型协议的固定实现：全部返回前置条件错误。
#[derive(Debug, Clone, Copy, Default)]
pub struct PollOnlyLifecycle;

impl ProtocolLifecycle for PollOnlyLifecycle {
    fn disconnect(&self, _connection_id: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Precondition(
            "Cannot disconnect: (not yet supported)",
        ))
    }

    fn broadcast(&self, _channels: &[String], _payload: &Value) -> Result<(), BridgeError> {
        Err(BridgeError::Precondition(
            "Cannot broadcast: the MODBUS protocol does not support realtime",
        ))
    }

    fn notify(
        &self,
        _channels: &[String],
        _connection_id: &str,
        _payload: &Value,
    ) -> Result<(), BridgeError> {
        Err(BridgeError::Precondition(
            "Cannot notify: the MODBUS protocol does not support realtime",
        ))
    }

    fn join_channel(&self, _channel: &str, _connection_id: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Precondition(
            "Cannot join a channel: the MODBUS protocol does not support realtime",
        ))
    }

    fn leave_channel(&self, _channel: &str, _connection_id: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Precondition(
            "Cannot leave a channel: the MODBUS protocol does not support realtime",
        ))
    }
}
