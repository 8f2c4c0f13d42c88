//! 寄存器桥接实现
//!
//! 把总线侧的寄存器/线圈访问翻译为文档存储操作：
//! - 读：按 ID 取文档；文档或地址不存在时返回寄存器区缺省值
//! - 写：局部更新（带冲突重试预算）；文档不存在时回退为新建
//! - 设备识别：取整份文档，按固定对象码打包六个识别字段
//!
//! 每次调用互相独立，不持有任何进程内锁；同一文档的并发写由存储端的
//! 乐观并发重试解决。

use crate::error::BridgeError;
use domain::{
    DeviceDocument, DeviceIdentity, RegisterBank, RegisterValue, UnitId, register_patch,
};
use regdoc_config::BridgeConfig;
use regdoc_storage::{CollectionRef, CreateOutcome, Document, DocumentStore, UpdateOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 桥接参数
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// 设备文档所在位置
    pub location: CollectionRef,
    /// 局部更新的冲突重试预算
    pub retry_on_conflict: u32,
    /// 单次存储调用超时（None 表示不限）
    pub store_timeout: Option<Duration>,
}

impl BridgeOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            location: CollectionRef::new(config.index.clone(), config.collection.clone()),
            retry_on_conflict: config.retry_on_conflict,
            store_timeout: config.store_timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&BridgeConfig::default())
    }
}

/// 寄存器桥接
pub struct RegisterBridge<S: ?Sized> {
    store: Arc<S>,
    options: BridgeOptions,
}

impl<S: ?Sized> Clone for RegisterBridge<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options.clone(),
        }
    }
}

/// 计算 `[addr, addr + count)` 的地址序列，越界时报错。
pub(crate) fn address_span(addr: u16, count: u16) -> Result<Vec<u16>, BridgeError> {
    let end = u32::from(addr) + u32::from(count);
    if end > u32::from(u16::MAX) + 1 {
        return Err(BridgeError::AddressRange { addr, count });
    }
    Ok((0..count).map(|offset| addr + offset).collect())
}

impl<S> RegisterBridge<S>
where
    S: DocumentStore + ?Sized,
{
    pub fn new(store: Arc<S>, options: BridgeOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 对单次存储调用套上可选超时。
    async fn call<T, F>(&self, fut: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, regdoc_storage::StorageError>>,
    {
        match self.options.store_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(BridgeError::Timeout(limit.as_millis() as u64)),
            },
            None => Ok(fut.await?),
        }
    }

    /// 读取设备文档；不存在返回 `None`。
    async fn fetch(&self, unit: UnitId) -> Result<Option<DeviceDocument>, BridgeError> {
        debug!(unit = %unit, "fetching document for device");
        let id = unit.document_id();
        let source = self
            .call(self.store.get_document(&self.options.location, &id))
            .await?;
        Ok(source.map(DeviceDocument::new))
    }

    /// 读取单个地址。
    pub async fn read(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
    ) -> Result<RegisterValue, BridgeError> {
        let mut values = self.read_range(unit, bank, addr, 1).await?;
        Ok(values.pop().unwrap_or_else(|| bank.default_value()))
    }

    /// 读取连续地址，整个区间只取一次文档。
    pub async fn read_range(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
        count: u16,
    ) -> Result<Vec<RegisterValue>, BridgeError> {
        let addresses = address_span(addr, count)?;
        let document = self.fetch(unit).await?;
        let mut values = Vec::with_capacity(addresses.len());
        for addr in addresses {
            regdoc_telemetry::record_register_read();
            let stored = match &document {
                Some(doc) => doc
                    .register(bank, addr)
                    .map_err(|source| BridgeError::UnreadableRegister { unit, source })?,
                None => None,
            };
            values.push(stored.unwrap_or_else(|| {
                regdoc_telemetry::record_defaulted_read();
                bank.default_value()
            }));
        }
        Ok(values)
    }

    /// 写入单个地址。
    pub async fn write(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
        value: RegisterValue,
    ) -> Result<(), BridgeError> {
        self.write_range(unit, bank, addr, &[value]).await
    }

    /// 写入连续地址，整个区间作为一次局部更新。
    pub async fn write_range(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
        values: &[RegisterValue],
    ) -> Result<(), BridgeError> {
        let count = u16::try_from(values.len()).map_err(|_| BridgeError::AddressRange {
            addr,
            count: u16::MAX,
        })?;
        let addresses = address_span(addr, count)?;
        // 空区间不触碰存储，也不会为新设备建文档
        if addresses.is_empty() {
            return Ok(());
        }
        let entries: Vec<(u16, RegisterValue)> =
            addresses.into_iter().zip(values.iter().copied()).collect();
        let patch = register_patch(bank, &entries);

        debug!(unit = %unit, bank = %bank, addr, values = ?values, "updating device");

        let result = self.upsert(unit, &patch).await;
        match &result {
            Ok(()) => {
                for _ in &entries {
                    regdoc_telemetry::record_register_write();
                }
                debug!(unit = %unit, "device updated");
            }
            Err(err) => {
                regdoc_telemetry::record_write_failure();
                debug!(unit = %unit, error = %err, "error while trying to update device");
            }
        }
        result
    }

    /// 更新优先；文档不存在时新建；新建撞上并发首写时再更新一次。
    async fn upsert(&self, unit: UnitId, patch: &Document) -> Result<(), BridgeError> {
        let location = &self.options.location;
        let id = unit.document_id();
        let retry = self.options.retry_on_conflict;

        match self
            .call(self.store.update_document(location, &id, patch, retry))
            .await?
        {
            UpdateOutcome::Updated { .. } => return Ok(()),
            UpdateOutcome::Conflict { attempts } => {
                return Err(BridgeError::ConflictExhausted { unit, attempts });
            }
            UpdateOutcome::NotFound => {}
        }

        debug!(unit = %unit, "data not found for device, creating document");
        match self
            .call(self.store.create_document(location, &id, patch))
            .await?
        {
            CreateOutcome::Created => {
                regdoc_telemetry::record_document_created();
                Ok(())
            }
            CreateOutcome::AlreadyExists => {
                debug!(unit = %unit, "document created concurrently, retrying update");
                match self
                    .call(self.store.update_document(location, &id, patch, retry))
                    .await?
                {
                    UpdateOutcome::Updated { .. } => Ok(()),
                    UpdateOutcome::Conflict { attempts } => {
                        Err(BridgeError::ConflictExhausted { unit, attempts })
                    }
                    UpdateOutcome::NotFound => Err(BridgeError::Vanished { unit }),
                }
            }
        }
    }

    /// 读取设备识别信息；文档不存在时所有对象均缺失。
    pub async fn read_device_identity(&self, unit: UnitId) -> Result<DeviceIdentity, BridgeError> {
        regdoc_telemetry::record_identity_read();
        let document = self.fetch(unit).await?;
        Ok(document
            .map(|doc| doc.identity())
            .unwrap_or_default())
    }
}
