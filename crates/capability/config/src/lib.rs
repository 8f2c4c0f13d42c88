//! 应用运行配置加载。
//!
//! 启动时组装一次：内置默认值按字段被 `REGDOC_*` 环境变量覆盖，
//! 之后以引用方式传给桥接层与存储层。

use domain::MappingSchema;
use std::env;
use std::path::Path;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 文档存储后端。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// 进程内存储（测试与演示）
    Memory,
    /// Redis 存储
    Redis { url: String },
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub index: String,
    pub collection: String,
    pub mappings: MappingSchema,
    pub debug: bool,
    pub retry_on_conflict: u32,
    pub store_timeout_ms: Option<u64>,
    pub store: StoreBackend,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 502,
            index: "modbus".to_string(),
            collection: "devices".to_string(),
            mappings: MappingSchema::default(),
            debug: false,
            retry_on_conflict: 10,
            store_timeout_ms: None,
            store: StoreBackend::Memory,
        }
    }
}

impl BridgeConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 用任意键值来源覆盖默认配置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let host = read("REGDOC_HOST").unwrap_or(defaults.host);
        let port = parse_or("REGDOC_PORT", read("REGDOC_PORT"), defaults.port)?;
        let index = read("REGDOC_INDEX").unwrap_or(defaults.index);
        let collection = read("REGDOC_COLLECTION").unwrap_or(defaults.collection);
        let mappings = match read("REGDOC_MAPPINGS_FILE") {
            Some(path) => load_mappings("REGDOC_MAPPINGS_FILE", Path::new(&path))?,
            None => defaults.mappings,
        };
        let debug = read("REGDOC_DEBUG")
            .map(|value| parse_bool(&value))
            .unwrap_or(defaults.debug);
        let retry_on_conflict = parse_or(
            "REGDOC_RETRY_ON_CONFLICT",
            read("REGDOC_RETRY_ON_CONFLICT"),
            defaults.retry_on_conflict,
        )?;
        let store_timeout_ms = match read("REGDOC_STORE_TIMEOUT_MS") {
            Some(value) => {
                let ms = parse_or("REGDOC_STORE_TIMEOUT_MS", Some(value), 0u64)?;
                (ms > 0).then_some(ms)
            }
            None => defaults.store_timeout_ms,
        };
        let store = match read("REGDOC_STORE").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("redis") => StoreBackend::Redis {
                url: read("REGDOC_REDIS_URL")
                    .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "REGDOC_STORE".to_string(),
                    other.to_string(),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            index,
            collection,
            mappings,
            debug,
            retry_on_conflict,
            store_timeout_ms,
            store,
        })
    }

    /// 监听地址 `host:port`。
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on")
}

/// 读取 JSON 映射描述文件。
fn load_mappings(key: &str, path: &Path) -> Result<MappingSchema, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| ConfigError::Invalid(key.to_string(), format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content)
        .map_err(|err| ConfigError::Invalid(key.to_string(), format!("{}: {}", path.display(), err)))
}
