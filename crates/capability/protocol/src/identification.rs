//! 设备识别（功能码 0x2B / MEI 0x0E）响应组装
//!
//! 帧编解码由 tokio-modbus 完成，这里只负责按读取类别挑选对象、
//! 控制单帧长度。缺失的识别对象直接省略，不会编码为空串。

use bytes::Bytes;
use domain::DeviceIdentity;
use tokio_modbus::prelude::{
    ConformityLevel, DeviceIdObject, ExceptionCode, ObjectId, ReadCode,
    ReadDeviceIdentificationResponse,
};

/// 一致性等级：扩展识别，支持流式与单对象访问
pub const CONFORMITY_LEVEL: ConformityLevel = ConformityLevel::ExtendedIdentification;

/// 单帧内对象区可用字节数（PDU 253 字节减去功能码与 6 字节响应头）
const MAX_OBJECTS_LEN: usize = 253 - 7;

/// 流式访问类别覆盖的对象码范围。
fn covers(read_code: ReadCode, object_id: ObjectId) -> bool {
    match read_code {
        ReadCode::Basic => object_id <= 0x02,
        ReadCode::Regular => object_id <= 0x7F,
        ReadCode::Extended | ReadCode::Specific => true,
    }
}

/// 按请求类别挑选识别对象。
///
/// 单对象访问请求的对象缺失时返回 `IllegalDataAddress`；流式访问的起始对象
/// 不属于本类别时从 0x00 重新开始。对象区放不下时置后续标志并给出下一对象码。
pub fn identification_response(
    read_code: ReadCode,
    object_id: ObjectId,
    identity: &DeviceIdentity,
) -> Result<ReadDeviceIdentificationResponse, ExceptionCode> {
    let objects: Vec<(u8, &str)> = match read_code {
        ReadCode::Specific => {
            let value = identity
                .get(object_id)
                .ok_or(ExceptionCode::IllegalDataAddress)?;
            vec![(object_id, value)]
        }
        code => {
            let start = if covers(code, object_id) && identity.codes().any(|id| id == object_id) {
                object_id
            } else {
                0x00
            };
            identity
                .present()
                .filter(|(id, _)| *id >= start && covers(code, *id))
                .collect()
        }
    };

    let mut device_id_objects = Vec::with_capacity(objects.len());
    let mut used = 0;
    let mut next_object_id = None;
    for (id, value) in objects {
        let bytes = value.as_bytes();
        let bytes = &bytes[..bytes.len().min(MAX_OBJECTS_LEN - 2)];
        if used + 2 + bytes.len() > MAX_OBJECTS_LEN {
            next_object_id = Some(id);
            break;
        }
        used += 2 + bytes.len();
        device_id_objects.push(DeviceIdObject {
            id,
            value: Bytes::copy_from_slice(bytes),
        });
    }

    Ok(ReadDeviceIdentificationResponse {
        read_code,
        conformity_level: CONFORMITY_LEVEL,
        more_follows: next_object_id.is_some(),
        next_object_id: next_object_id.unwrap_or(0x00),
        device_id_objects,
    })
}
