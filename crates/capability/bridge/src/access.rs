//! 寄存器访问能力接口
//!
//! 协议层持有 `Arc<dyn RegisterAccess>`，只通过这六个具名操作访问设备数据。
//! 区间读写提供逐地址循环的默认实现，`RegisterBridge` 覆盖为单次存储往返。

use crate::bridge::{RegisterBridge, address_span};
use crate::error::BridgeError;
use async_trait::async_trait;
use domain::{DeviceIdentity, RegisterBank, RegisterValue, UnitId};
use regdoc_storage::DocumentStore;

/// 寄存器访问接口
#[async_trait]
pub trait RegisterAccess: Send + Sync {
    /// 读输入寄存器（缺省 0）
    async fn get_input_register(&self, unit: UnitId, addr: u16)
    -> Result<RegisterValue, BridgeError>;

    /// 读保持寄存器（缺省 0）
    async fn get_holding_register(
        &self,
        unit: UnitId,
        addr: u16,
    ) -> Result<RegisterValue, BridgeError>;

    /// 读线圈（缺省 false）
    async fn get_coil(&self, unit: UnitId, addr: u16) -> Result<RegisterValue, BridgeError>;

    /// 写保持寄存器
    async fn set_holding_register(
        &self,
        unit: UnitId,
        addr: u16,
        value: u16,
    ) -> Result<(), BridgeError>;

    /// 写线圈
    async fn set_coil(&self, unit: UnitId, addr: u16, value: bool) -> Result<(), BridgeError>;

    /// 读设备识别信息
    async fn read_device_identification(&self, unit: UnitId)
    -> Result<DeviceIdentity, BridgeError>;

    /// 读连续地址
    async fn get_registers(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
        count: u16,
    ) -> Result<Vec<RegisterValue>, BridgeError> {
        let mut values = Vec::with_capacity(usize::from(count));
        for addr in address_span(addr, count)? {
            let value = match bank {
                RegisterBank::Input => self.get_input_register(unit, addr).await?,
                RegisterBank::Holding => self.get_holding_register(unit, addr).await?,
                RegisterBank::Coil => self.get_coil(unit, addr).await?,
            };
            values.push(value);
        }
        Ok(values)
    }

    /// 写连续保持寄存器
    async fn set_holding_registers(
        &self,
        unit: UnitId,
        addr: u16,
        values: &[u16],
    ) -> Result<(), BridgeError> {
        let count = u16::try_from(values.len()).map_err(|_| BridgeError::AddressRange {
            addr,
            count: u16::MAX,
        })?;
        for (addr, value) in address_span(addr, count)?.into_iter().zip(values) {
            self.set_holding_register(unit, addr, *value).await?;
        }
        Ok(())
    }

    /// 写连续线圈
    async fn set_coils(&self, unit: UnitId, addr: u16, values: &[bool]) -> Result<(), BridgeError> {
        let count = u16::try_from(values.len()).map_err(|_| BridgeError::AddressRange {
            addr,
            count: u16::MAX,
        })?;
        for (addr, value) in address_span(addr, count)?.into_iter().zip(values) {
            self.set_coil(unit, addr, *value).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S> RegisterAccess for RegisterBridge<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get_input_register(
        &self,
        unit: UnitId,
        addr: u16,
    ) -> Result<RegisterValue, BridgeError> {
        self.read(unit, RegisterBank::Input, addr).await
    }

    async fn get_holding_register(
        &self,
        unit: UnitId,
        addr: u16,
    ) -> Result<RegisterValue, BridgeError> {
        self.read(unit, RegisterBank::Holding, addr).await
    }

    async fn get_coil(&self, unit: UnitId, addr: u16) -> Result<RegisterValue, BridgeError> {
        self.read(unit, RegisterBank::Coil, addr).await
    }

    async fn set_holding_register(
        &self,
        unit: UnitId,
        addr: u16,
        value: u16,
    ) -> Result<(), BridgeError> {
        self.write(unit, RegisterBank::Holding, addr, RegisterValue::from(value))
            .await
    }

    async fn set_coil(&self, unit: UnitId, addr: u16, value: bool) -> Result<(), BridgeError> {
        self.write(unit, RegisterBank::Coil, addr, RegisterValue::Bool(value))
            .await
    }

    async fn read_device_identification(
        &self,
        unit: UnitId,
    ) -> Result<DeviceIdentity, BridgeError> {
        self.read_device_identity(unit).await
    }

    async fn get_registers(
        &self,
        unit: UnitId,
        bank: RegisterBank,
        addr: u16,
        count: u16,
    ) -> Result<Vec<RegisterValue>, BridgeError> {
        self.read_range(unit, bank, addr, count).await
    }

    async fn set_holding_registers(
        &self,
        unit: UnitId,
        addr: u16,
        values: &[u16],
    ) -> Result<(), BridgeError> {
        let values: Vec<RegisterValue> = values.iter().map(|v| RegisterValue::from(*v)).collect();
        self.write_range(unit, RegisterBank::Holding, addr, &values)
            .await
    }

    async fn set_coils(&self, unit: UnitId, addr: u16, values: &[bool]) -> Result<(), BridgeError> {
        let values: Vec<RegisterValue> = values.iter().map(|v| RegisterValue::Bool(*v)).collect();
        self.write_range(unit, RegisterBank::Coil, addr, &values)
            .await
    }
}
