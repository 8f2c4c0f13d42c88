//! # 协议通信能力模块
//!
//! 以 Modbus TCP 从站身份对外服务，把总线请求翻译为寄存器访问调用：
//! - **读**：线圈 (0x01)、保持寄存器 (0x03)、输入寄存器 (0x04)
//! - **写**：单/多线圈 (0x05 / 0x0F)、单/多保持寄存器 (0x06 / 0x10)
//! - **设备识别**：0x2B / MEI 0x0E
//!
//! ## 架构设计
//!
//! ```text
//! TCP 连接 (tokio-modbus Server)
//!       │
//!       ▼
//! RegisterService（每个连接一个，事务级 span + request_id）
//!       │
//!       ▼
//! Arc<dyn RegisterAccess>
//!       │
//!       ▼
//! RegisterBridge → DocumentStore
//! ```
//!
//! 桥接层错误在这里映射为 Modbus 异常码，见 [`exception_for`]。

mod error;
mod exception;
mod identification;
mod server;
mod service;

pub use error::ProtocolError;
pub use exception::exception_for;
pub use identification::{CONFORMITY_LEVEL, identification_response};
pub use server::ModbusServer;
pub use service::RegisterService;
