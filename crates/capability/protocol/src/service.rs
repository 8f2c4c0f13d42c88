//! Modbus 请求处理
//!
//! 每个 TCP 连接持有一个 [`RegisterService`]；每个事务在独立的 `transaction`
//! span 中执行，并带有唯一的 request_id。

use crate::exception::exception_for;
use crate::identification::identification_response;
use domain::{RegisterBank, RegisterValue, UnitId};
use regdoc_bridge::RegisterAccess;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio_modbus::prelude::*;
use tracing::{Instrument, debug, info_span, warn};

/// 单个连接上的 Modbus 服务
#[derive(Clone)]
pub struct RegisterService {
    access: Arc<dyn RegisterAccess>,
    peer: SocketAddr,
}

impl RegisterService {
    pub fn new(access: Arc<dyn RegisterAccess>, peer: SocketAddr) -> Self {
        Self { access, peer }
    }
}

impl tokio_modbus::server::Service for RegisterService {
    type Request = SlaveRequest<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = Pin<Box<dyn Future<Output = Result<Response, ExceptionCode>> + Send>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let access = Arc::clone(&self.access);
        let unit = UnitId(req.slave);
        let function = function_name(&req.request);
        let span = info_span!(
            "transaction",
            request_id = %regdoc_telemetry::new_request_id(),
            peer = %self.peer,
            unit = %unit,
            function,
        );

        Box::pin(
            async move {
                debug!(request = ?req.request, "received modbus request");
                let result = handle(access.as_ref(), unit, req.request).await;
                if let Err(exception) = &result {
                    regdoc_telemetry::record_rejected_request();
                    warn!(exception = ?exception, "modbus request rejected");
                }
                result
            }
            .instrument(span),
        )
    }
}

/// 把一个总线请求分派到寄存器访问接口。
async fn handle(
    access: &dyn RegisterAccess,
    unit: UnitId,
    request: Request<'static>,
) -> Result<Response, ExceptionCode> {
    match request {
        Request::ReadCoils(addr, count) => {
            check_quantity(count)?;
            let values = access
                .get_registers(unit, RegisterBank::Coil, addr, count)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::ReadCoils(
                values.iter().map(RegisterValue::as_coil).collect(),
            ))
        }
        Request::ReadHoldingRegisters(addr, count) => {
            check_quantity(count)?;
            let values = access
                .get_registers(unit, RegisterBank::Holding, addr, count)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::ReadHoldingRegisters(to_words(&values)?))
        }
        Request::ReadInputRegisters(addr, count) => {
            check_quantity(count)?;
            let values = access
                .get_registers(unit, RegisterBank::Input, addr, count)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::ReadInputRegisters(to_words(&values)?))
        }
        Request::WriteSingleCoil(addr, value) => {
            access
                .set_coil(unit, addr, value)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::WriteSingleCoil(addr, value))
        }
        Request::WriteMultipleCoils(addr, values) => {
            let count = quantity_of(values.len())?;
            access
                .set_coils(unit, addr, &values)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::WriteMultipleCoils(addr, count))
        }
        Request::WriteSingleRegister(addr, value) => {
            access
                .set_holding_register(unit, addr, value)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::WriteSingleRegister(addr, value))
        }
        Request::WriteMultipleRegisters(addr, values) => {
            let count = quantity_of(values.len())?;
            access
                .set_holding_registers(unit, addr, &values)
                .await
                .map_err(|err| bridge_exception(&err))?;
            Ok(Response::WriteMultipleRegisters(addr, count))
        }
        Request::ReadDeviceIdentification(read_code, object_id) => {
            let identity = access
                .read_device_identification(unit)
                .await
                .map_err(|err| bridge_exception(&err))?;
            let response = identification_response(read_code, object_id, &identity)?;
            Ok(Response::ReadDeviceIdentification(response))
        }
        // 离散输入不在文档模型中
        Request::ReadDiscreteInputs(..) => Err(ExceptionCode::IllegalFunction),
        _ => Err(ExceptionCode::IllegalFunction),
    }
}

fn function_name(request: &Request<'_>) -> &'static str {
    match request {
        Request::ReadCoils(..) => "read_coils",
        Request::ReadDiscreteInputs(..) => "read_discrete_inputs",
        Request::ReadHoldingRegisters(..) => "read_holding_registers",
        Request::ReadInputRegisters(..) => "read_input_registers",
        Request::WriteSingleCoil(..) => "write_single_coil",
        Request::WriteMultipleCoils(..) => "write_multiple_coils",
        Request::WriteSingleRegister(..) => "write_single_register",
        Request::WriteMultipleRegisters(..) => "write_multiple_registers",
        Request::ReadDeviceIdentification(..) => "read_device_identification",
        _ => "unsupported",
    }
}

fn bridge_exception(err: &regdoc_bridge::BridgeError) -> ExceptionCode {
    warn!(error = %err, "register access failed");
    exception_for(err)
}

fn check_quantity(count: u16) -> Result<(), ExceptionCode> {
    if count == 0 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

fn quantity_of(len: usize) -> Result<u16, ExceptionCode> {
    match u16::try_from(len) {
        Ok(0) | Err(_) => Err(ExceptionCode::IllegalDataValue),
        Ok(count) => Ok(count),
    }
}

/// 文档中的值必须能放进 16 位寄存器。
fn to_words(values: &[RegisterValue]) -> Result<Vec<u16>, ExceptionCode> {
    values
        .iter()
        .map(|value| {
            value.to_word().ok_or_else(|| {
                debug!(value = ?value, "stored value does not fit a register");
                ExceptionCode::IllegalDataValue
            })
        })
        .collect()
}
