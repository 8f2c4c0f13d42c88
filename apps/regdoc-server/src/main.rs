//! Modbus TCP ↔ 设备文档桥接服务。
//!
//! 启动顺序：配置 → 日志 → 文档存储 → 初始化索引/映射 → 绑定端口 → 服务直到 Ctrl-C。
//! 存储初始化失败时直接退出，不会打开 Modbus 端口。
//! 运行期间每分钟输出一次计数器，退出前再输出一次。

use regdoc_bridge::{BridgeOptions, RegisterAccess, RegisterBridge};
use regdoc_config::{BridgeConfig, StoreBackend};
use regdoc_protocol::ModbusServer;
use regdoc_storage::{
    DocumentStore, InMemoryDocumentStore, ProvisionOutcome, RedisDocumentStore, prepare,
};
use regdoc_telemetry::{init_tracing, log_metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const METRICS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = BridgeConfig::from_env()?;
    // 初始化结构化日志
    init_tracing(config.debug);

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Memory => {
            warn!("using in-memory document store, data is lost on exit");
            Arc::new(InMemoryDocumentStore::new())
        }
        StoreBackend::Redis { url } => Arc::new(RedisDocumentStore::connect(url)?),
    };

    let options = BridgeOptions::from_config(&config);
    match prepare(store.as_ref(), &options.location, &config.mappings).await? {
        ProvisionOutcome::Created => info!(location = %options.location, "document index created"),
        ProvisionOutcome::AlreadyPresent => {
            info!(location = %options.location, "document index already present")
        }
    }

    let access: Arc<dyn RegisterAccess> = Arc::new(RegisterBridge::new(store, options));
    let server = ModbusServer::bind(&config.listen_addr(), access).await?;
    info!(
        port = server.local_addr()?.port(),
        "modbus protocol listening on port"
    );

    let reporter = tokio::spawn(async {
        let mut ticker = tokio::time::interval(METRICS_INTERVAL);
        // 第一次 tick 立即完成
        ticker.tick().await;
        loop {
            ticker.tick().await;
            log_metrics("periodic");
        }
    });

    let served = tokio::select! {
        result = server.serve() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };
    reporter.abort();
    log_metrics("shutdown");
    served?;
    Ok(())
}
