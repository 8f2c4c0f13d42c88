//! Modbus TCP 服务端
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let server = ModbusServer::bind("0.0.0.0:502", access).await?;
//! info!(port = server.local_addr()?.port(), "modbus protocol listening on port");
//! server.serve().await?;
//! ```
//!
//! `bind` 返回即表示端口已就绪；调用方应在存储初始化完成之后再调用。

use crate::error::ProtocolError;
use crate::service::RegisterService;
use regdoc_bridge::{BridgeError, PollOnlyLifecycle, ProtocolLifecycle, RegisterAccess};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_modbus::server::tcp::{Server, accept_tcp_connection};
use tracing::{debug, warn};

/// Modbus TCP 服务端
pub struct ModbusServer {
    listener: TcpListener,
    access: Arc<dyn RegisterAccess>,
    lifecycle: PollOnlyLifecycle,
}

impl ModbusServer {
    /// 绑定监听地址
    pub async fn bind(addr: &str, access: Arc<dyn RegisterAccess>) -> Result<Self, ProtocolError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ProtocolError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            access,
            lifecycle: PollOnlyLifecycle,
        })
    }

    /// 实际监听地址（绑定端口 0 时用于获取分配的端口）
    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    /// 接受连接并处理请求，直到监听出错或任务被取消
    pub async fn serve(self) -> Result<(), ProtocolError> {
        let server = Server::new(self.listener);
        let access = self.access;

        let on_connected = move |stream, peer: SocketAddr| {
            let access = Arc::clone(&access);
            async move {
                debug!(peer = %peer, "modbus client connected");
                accept_tcp_connection(stream, peer, move |peer| {
                    Ok(Some(RegisterService::new(Arc::clone(&access), peer)))
                })
            }
        };
        let on_process_error = |err| {
            warn!(error = %err, "modbus connection error");
        };

        server.serve(&on_connected, on_process_error).await?;
        Ok(())
    }
}

impl ProtocolLifecycle for ModbusServer {
    fn disconnect(&self, connection_id: &str) -> Result<(), BridgeError> {
        self.lifecycle.disconnect(connection_id)
    }

    fn broadcast(&self, channels: &[String], payload: &Value) -> Result<(), BridgeError> {
        self.lifecycle.broadcast(channels, payload)
    }

    fn notify(
        &self,
        channels: &[String],
        connection_id: &str,
        payload: &Value,
    ) -> Result<(), BridgeError> {
        self.lifecycle.notify(channels, connection_id, payload)
    }

    fn join_channel(&self, channel: &str, connection_id: &str) -> Result<(), BridgeError> {
        self.lifecycle.join_channel(channel, connection_id)
    }

    fn leave_channel(&self, channel: &str, connection_id: &str) -> Result<(), BridgeError> {
        self.lifecycle.leave_channel(channel, connection_id)
    }
}
