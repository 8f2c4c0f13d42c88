//! # 寄存器桥接能力模块
//!
//! Modbus 寄存器地址 ↔ 每台设备一份文档的翻译与同步层：
//!
//! ```text
//! Modbus 请求 (unit, 寄存器区, 地址[, 值])
//!       │
//!       ▼
//! RegisterAccess (六个具名操作)
//!       │
//!       ▼
//! RegisterBridge ── get / update(retry_on_conflict) / create
//!       │
//!       ▼
//! DocumentStore
//! ```
//!
//! ## 文档结构
//!
//! ```json
//! {
//!   "input":   { "<addr>": <value> },
//!   "holding": { "<addr>": <value> },
//!   "coil":    { "<addr>": true },
//!   "vendor": "...", "productCode": "...", "majorMinorRevision": "...",
//!   "model": "...", "extended1": "...", "extended2": "..."
//! }
//! ```

mod access;
mod bridge;
mod error;
mod lifecycle;

pub use access::RegisterAccess;
pub use bridge::{BridgeOptions, RegisterBridge};
pub use error::BridgeError;
pub use lifecycle::{PollOnlyLifecycle, ProtocolLifecycle};
