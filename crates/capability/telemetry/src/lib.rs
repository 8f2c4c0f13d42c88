//! 追踪、事务 ID 与计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub register_reads: u64,
    pub defaulted_reads: u64,
    pub register_writes: u64,
    pub documents_created: u64,
    pub write_failures: u64,
    pub identity_reads: u64,
    pub rejected_requests: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    register_reads: AtomicU64,
    defaulted_reads: AtomicU64,
    register_writes: AtomicU64,
    documents_created: AtomicU64,
    write_failures: AtomicU64,
    identity_reads: AtomicU64,
    rejected_requests: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            register_reads: AtomicU64::new(0),
            defaulted_reads: AtomicU64::new(0),
            register_writes: AtomicU64::new(0),
            documents_created: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            identity_reads: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            register_reads: self.register_reads.load(Ordering::Relaxed),
            defaulted_reads: self.defaulted_reads.load(Ordering::Relaxed),
            register_writes: self.register_writes.load(Ordering::Relaxed),
            documents_created: self.documents_created.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            identity_reads: self.identity_reads.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 以一条 info 日志输出当前计数器。
pub fn log_metrics(reason: &'static str) {
    let snapshot = metrics().snapshot();
    tracing::info!(
        reason,
        register_reads = snapshot.register_reads,
        defaulted_reads = snapshot.defaulted_reads,
        register_writes = snapshot.register_writes,
        documents_created = snapshot.documents_created,
        write_failures = snapshot.write_failures,
        identity_reads = snapshot.identity_reads,
        rejected_requests = snapshot.rejected_requests,
        "bridge metrics"
    );
}

/// 初始化 tracing：优先 RUST_LOG，否则 debug 开关决定 debug / info。
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的事务 request_id。
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录寄存器读取次数。
pub fn record_register_read() {
    metrics().register_reads.fetch_add(1, Ordering::Relaxed);
}

/// 记录返回缺省值的读取次数（文档或地址不存在）。
pub fn record_defaulted_read() {
    metrics().defaulted_reads.fetch_add(1, Ordering::Relaxed);
}

pub fn record_register_write() {
    metrics().register_writes.fetch_add(1, Ordering::Relaxed);
}

/// 记录首次写入时新建文档的次数。
pub fn record_document_created() {
    metrics().documents_created.fetch_add(1, Ordering::Relaxed);
}

pub fn record_write_failure() {
    metrics().write_failures.fetch_add(1, Ordering::Relaxed);
}

pub fn record_identity_read() {
    metrics().identity_reads.fetch_add(1, Ordering::Relaxed);
}

/// 记录以异常码拒绝的总线请求。
pub fn record_rejected_request() {
    metrics().rejected_requests.fetch_add(1, Ordering::Relaxed);
}
