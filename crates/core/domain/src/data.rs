use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 寄存器区（文档中的三个子对象）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterBank {
    Input,
    Holding,
    Coil,
}

impl RegisterBank {
    pub const ALL: [RegisterBank; 3] = [Self::Input, Self::Holding, Self::Coil];

    /// 文档字段名。
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Holding => "holding",
            Self::Coil => "coil",
        }
    }

    /// 未写入地址的缺省值：寄存器为 0，线圈为 false。
    pub fn default_value(&self) -> RegisterValue {
        match self {
            Self::Coil => RegisterValue::Bool(false),
            Self::Input | Self::Holding => RegisterValue::Int(0),
        }
    }
}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterBank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::Input),
            "holding" => Ok(Self::Holding),
            "coil" => Ok(Self::Coil),
            other => Err(format!("unknown register bank: {other}")),
        }
    }
}

/// 单个地址上保存的值，按存储内容原样返回。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Bool(bool),
    Int(i64),
}

impl RegisterValue {
    /// 线圈语义：布尔值原样，整数非 0 即为 ON。
    pub fn as_coil(&self) -> bool {
        match self {
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
        }
    }

    /// 寄存器语义：布尔值按 0/1 处理。
    pub fn as_int(&self) -> i64 {
        match self {
            Self::Bool(v) => i64::from(*v),
            Self::Int(v) => *v,
        }
    }

    /// 编码为 16 位寄存器字；负数在 i16 范围内按补码编码。
    pub fn to_word(&self) -> Option<u16> {
        let value = self.as_int();
        if let Ok(word) = u16::try_from(value) {
            return Some(word);
        }
        i16::try_from(value).ok().map(|v| v as u16)
    }
}

impl RegisterValue {
    /// 从文档中的 JSON 值解释：布尔、整数、无小数部分的浮点数；其余返回 `None`。
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Number(n) => n.as_i64().map(Self::Int).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| Self::Int(f as i64))
            }),
            _ => None,
        }
    }
}

impl From<bool> for RegisterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RegisterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for RegisterValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<RegisterValue> for Value {
    fn from(value: RegisterValue) -> Self {
        match value {
            RegisterValue::Bool(v) => Value::Bool(v),
            RegisterValue::Int(v) => Value::from(v),
        }
    }
}

/// 地址上保存的内容无法解释为寄存器值或线圈值。
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableRegister {
    pub bank: RegisterBank,
    pub addr: u16,
    pub value: Value,
}

impl fmt::Display for UnreadableRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] holds {}", self.bank, self.addr, self.value)
    }
}

impl std::error::Error for UnreadableRegister {}

/// 设备文档（每个从站一份，ID 为从站地址字符串）。
///
/// 直接包装存储返回的原始 JSON：读取时只看被请求的 `bank`/`addr` 路径，
/// 其他字段的内容不影响本次读取。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDocument {
    source: Map<String, Value>,
}

impl DeviceDocument {
    pub fn new(source: Map<String, Value>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }

    /// 读取地址上保存的值；寄存器区或地址不存在时为 `None`。
    pub fn register(
        &self,
        bank: RegisterBank,
        addr: u16,
    ) -> Result<Option<RegisterValue>, UnreadableRegister> {
        let Some(registers) = self.source.get(bank.as_str()) else {
            return Ok(None);
        };
        let unreadable = |value: &Value| UnreadableRegister {
            bank,
            addr,
            value: value.clone(),
        };
        let Some(registers) = registers.as_object() else {
            return Err(unreadable(registers));
        };
        match registers.get(&addr.to_string()) {
            None => Ok(None),
            Some(value) => RegisterValue::from_json(value)
                .map(Some)
                .ok_or_else(|| unreadable(value)),
        }
    }

    /// 提取设备识别信息；非字符串字段按缺失处理。
    pub fn identity(&self) -> DeviceIdentity {
        let mut identity = DeviceIdentity::default();
        for object in IdentityObject::ALL {
            if let Some(value) = self.source.get(object.field()).and_then(Value::as_str) {
                identity.set(object, value);
            }
        }
        identity
    }
}

/// 构造局部更新体：`{bank: {addr: value, ...}}`。
pub fn register_patch(bank: RegisterBank, entries: &[(u16, RegisterValue)]) -> Map<String, Value> {
    let registers: Map<String, Value> = entries
        .iter()
        .map(|(addr, value)| (addr.to_string(), Value::from(*value)))
        .collect();
    let mut body = Map::new();
    body.insert(bank.as_str().to_string(), Value::Object(registers));
    body
}

/// 设备识别对象（Read Device Identification 对象码）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityObject {
    VendorName,
    ProductCode,
    MajorMinorRevision,
    ModelName,
    Extended1,
    Extended2,
}

impl IdentityObject {
    pub const ALL: [IdentityObject; 6] = [
        Self::VendorName,
        Self::ProductCode,
        Self::MajorMinorRevision,
        Self::ModelName,
        Self::Extended1,
        Self::Extended2,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::VendorName => 0x00,
            Self::ProductCode => 0x01,
            Self::MajorMinorRevision => 0x02,
            Self::ModelName => 0x05,
            Self::Extended1 => 0x97,
            Self::Extended2 => 0xAB,
        }
    }

    /// 文档中的字段名。
    pub fn field(&self) -> &'static str {
        match self {
            Self::VendorName => "vendor",
            Self::ProductCode => "productCode",
            Self::MajorMinorRevision => "majorMinorRevision",
            Self::ModelName => "model",
            Self::Extended1 => "extended1",
            Self::Extended2 => "extended2",
        }
    }
}

/// 设备识别结果：固定对象码 → 字符串；文档缺失的字段为 `None`，不会填空串。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    objects: BTreeMap<u8, Option<String>>,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            objects: IdentityObject::ALL
                .into_iter()
                .map(|object| (object.code(), None))
                .collect(),
        }
    }
}

impl DeviceIdentity {
    /// 所有对象码（固定六个）。
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.objects.keys().copied()
    }

    pub fn get(&self, code: u8) -> Option<&str> {
        self.objects.get(&code).and_then(|value| value.as_deref())
    }

    /// 仅返回有值的对象，按对象码升序。
    pub fn present(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.objects
            .iter()
            .filter_map(|(code, value)| value.as_deref().map(|v| (*code, v)))
    }

    pub fn set(&mut self, object: IdentityObject, value: impl Into<String>) {
        self.objects.insert(object.code(), Some(value.into()));
    }
}
