// MIT License - Copyright (c) 2026 Peter Wright
// ZCL attribute values keyed on their runtime data-type tag

use serde::Serialize;

use crate::codec::{hex, CodecError, CodecResult, Decoder, Encoder, Wire};

wire_enum! {
    /// ZCL primitive data types, as carried in the tag byte before a value.
    pub enum ZclDataType: u8 {
        NoData = 0x00,
        Data8 = 0x08,
        Data16 = 0x09,
        Data24 = 0x0a,
        Data32 = 0x0b,
        Data40 = 0x0c,
        Data48 = 0x0d,
        Data56 = 0x0e,
        Data64 = 0x0f,
        Boolean = 0x10,
        Bitmap8 = 0x18,
        Bitmap16 = 0x19,
        Bitmap24 = 0x1a,
        Bitmap32 = 0x1b,
        Bitmap40 = 0x1c,
        Bitmap48 = 0x1d,
        Bitmap56 = 0x1e,
        Bitmap64 = 0x1f,
        Uint8 = 0x20,
        Uint16 = 0x21,
        Uint24 = 0x22,
        Uint32 = 0x23,
        Uint40 = 0x24,
        Uint48 = 0x25,
        Uint56 = 0x26,
        Uint64 = 0x27,
        Int8 = 0x28,
        Int16 = 0x29,
        Int24 = 0x2a,
        Int32 = 0x2b,
        Int40 = 0x2c,
        Int48 = 0x2d,
        Int56 = 0x2e,
        Int64 = 0x2f,
        Enum8 = 0x30,
        Enum16 = 0x31,
        SemiPrec = 0x38,
        SinglePrec = 0x39,
        DoublePrec = 0x3a,
        OctetStr = 0x41,
        CharStr = 0x42,
        LongOctetStr = 0x43,
        LongCharStr = 0x44,
        Array = 0x48,
        Struct = 0x4c,
        Set = 0x50,
        Bag = 0x51,
        TimeOfDay = 0xe0,
        Date = 0xe1,
        Utc = 0xe2,
        ClusterId = 0xe8,
        AttrId = 0xe9,
        BacOid = 0xea,
        IeeeAddr = 0xf0,
        SecurityKey = 0xf1,
        Unknown = 0xff,
    }
}

impl ZclDataType {
    /// Whether reports for this type carry a reportable-change threshold.
    /// Discrete types (bitmaps, enums, strings, ids) do not.
    pub fn is_analog(&self) -> bool {
        use ZclDataType::*;
        matches!(
            self,
            Uint8 | Uint16 | Uint24 | Uint32 | Uint40 | Uint48 | Uint56 | Uint64
                | Int8 | Int16 | Int24 | Int32 | Int40 | Int48 | Int56 | Int64
                | SemiPrec | SinglePrec | DoublePrec
                | TimeOfDay | Date | Utc
        )
    }
}

wire_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct TimeOfDay {
        pub hours: u8,
        pub minutes: u8,
        pub seconds: u8,
        pub hundredths: u8,
    }
}

wire_struct! {
    /// `year` counts from 1900.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct Date {
        pub year: u8,
        pub month: u8,
        pub day_of_month: u8,
        pub day_of_week: u8,
    }
}

/// An attribute value. The variant is the data type.
///
/// On the wire a value is written as its tag byte followed by the payload;
/// array, set and bag elements share one element tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum AttributeValue {
    NoData,
    Data8([u8; 1]),
    Data16([u8; 2]),
    Data24([u8; 3]),
    Data32([u8; 4]),
    Data40([u8; 5]),
    Data48([u8; 6]),
    Data56([u8; 7]),
    Data64([u8; 8]),
    Boolean(bool),
    Bitmap8(u8),
    Bitmap16(u16),
    Bitmap24(u32),
    Bitmap32(u32),
    Bitmap40(u64),
    Bitmap48(u64),
    Bitmap56(u64),
    Bitmap64(u64),
    Uint8(u8),
    Uint16(u16),
    Uint24(u32),
    Uint32(u32),
    Uint40(u64),
    Uint48(u64),
    Uint56(u64),
    Uint64(u64),
    Int8(i8),
    Int16(i16),
    Int24(i32),
    Int32(i32),
    Int40(i64),
    Int48(i64),
    Int56(i64),
    Int64(i64),
    Enum8(u8),
    Enum16(u16),
    /// Raw IEEE-754 binary16 bits.
    SemiPrec(u16),
    SinglePrec(f32),
    DoublePrec(f64),
    OctetStr(Vec<u8>),
    CharStr(String),
    LongOctetStr(Vec<u8>),
    LongCharStr(String),
    Array(Collection),
    Struct(Vec<AttributeValue>),
    Set(Collection),
    Bag(Collection),
    TimeOfDay(TimeOfDay),
    Date(Date),
    Utc(u32),
    ClusterId(u16),
    AttrId(u16),
    BacOid(u32),
    /// `0x`-prefixed 16-digit hex string.
    IeeeAddr(String),
    SecurityKey([u8; 16]),
    Unknown,
}

/// Homogeneous array, set or bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub element_type: ZclDataType,
    pub elements: Vec<AttributeValue>,
}

impl AttributeValue {
    pub fn data_type(&self) -> ZclDataType {
        use AttributeValue as V;
        match self {
            V::NoData => ZclDataType::NoData,
            V::Data8(_) => ZclDataType::Data8,
            V::Data16(_) => ZclDataType::Data16,
            V::Data24(_) => ZclDataType::Data24,
            V::Data32(_) => ZclDataType::Data32,
            V::Data40(_) => ZclDataType::Data40,
            V::Data48(_) => ZclDataType::Data48,
            V::Data56(_) => ZclDataType::Data56,
            V::Data64(_) => ZclDataType::Data64,
            V::Boolean(_) => ZclDataType::Boolean,
            V::Bitmap8(_) => ZclDataType::Bitmap8,
            V::Bitmap16(_) => ZclDataType::Bitmap16,
            V::Bitmap24(_) => ZclDataType::Bitmap24,
            V::Bitmap32(_) => ZclDataType::Bitmap32,
            V::Bitmap40(_) => ZclDataType::Bitmap40,
            V::Bitmap48(_) => ZclDataType::Bitmap48,
            V::Bitmap56(_) => ZclDataType::Bitmap56,
            V::Bitmap64(_) => ZclDataType::Bitmap64,
            V::Uint8(_) => ZclDataType::Uint8,
            V::Uint16(_) => ZclDataType::Uint16,
            V::Uint24(_) => ZclDataType::Uint24,
            V::Uint32(_) => ZclDataType::Uint32,
            V::Uint40(_) => ZclDataType::Uint40,
            V::Uint48(_) => ZclDataType::Uint48,
            V::Uint56(_) => ZclDataType::Uint56,
            V::Uint64(_) => ZclDataType::Uint64,
            V::Int8(_) => ZclDataType::Int8,
            V::Int16(_) => ZclDataType::Int16,
            V::Int24(_) => ZclDataType::Int24,
            V::Int32(_) => ZclDataType::Int32,
            V::Int40(_) => ZclDataType::Int40,
            V::Int48(_) => ZclDataType::Int48,
            V::Int56(_) => ZclDataType::Int56,
            V::Int64(_) => ZclDataType::Int64,
            V::Enum8(_) => ZclDataType::Enum8,
            V::Enum16(_) => ZclDataType::Enum16,
            V::SemiPrec(_) => ZclDataType::SemiPrec,
            V::SinglePrec(_) => ZclDataType::SinglePrec,
            V::DoublePrec(_) => ZclDataType::DoublePrec,
            V::OctetStr(_) => ZclDataType::OctetStr,
            V::CharStr(_) => ZclDataType::CharStr,
            V::LongOctetStr(_) => ZclDataType::LongOctetStr,
            V::LongCharStr(_) => ZclDataType::LongCharStr,
            V::Array(_) => ZclDataType::Array,
            V::Struct(_) => ZclDataType::Struct,
            V::Set(_) => ZclDataType::Set,
            V::Bag(_) => ZclDataType::Bag,
            V::TimeOfDay(_) => ZclDataType::TimeOfDay,
            V::Date(_) => ZclDataType::Date,
            V::Utc(_) => ZclDataType::Utc,
            V::ClusterId(_) => ZclDataType::ClusterId,
            V::AttrId(_) => ZclDataType::AttrId,
            V::BacOid(_) => ZclDataType::BacOid,
            V::IeeeAddr(_) => ZclDataType::IeeeAddr,
            V::SecurityKey(_) => ZclDataType::SecurityKey,
            V::Unknown => ZclDataType::Unknown,
        }
    }

    /// Text of a character or octet string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::CharStr(s) | AttributeValue::LongCharStr(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of unsigned, enum and bitmap values.
    pub fn as_u64(&self) -> Option<u64> {
        use AttributeValue as V;
        match *self {
            V::Uint8(v) | V::Enum8(v) | V::Bitmap8(v) => Some(v.into()),
            V::Uint16(v) | V::Enum16(v) | V::Bitmap16(v) => Some(v.into()),
            V::Uint24(v) | V::Uint32(v) | V::Bitmap24(v) | V::Bitmap32(v) => Some(v.into()),
            V::Uint40(v) | V::Uint48(v) | V::Uint56(v) | V::Uint64(v) => Some(v),
            V::Bitmap40(v) | V::Bitmap48(v) | V::Bitmap56(v) | V::Bitmap64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        use AttributeValue as V;
        match *self {
            V::Int8(v) => Some(v.into()),
            V::Int16(v) => Some(v.into()),
            V::Int24(v) | V::Int32(v) => Some(v.into()),
            V::Int40(v) | V::Int48(v) | V::Int56(v) | V::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            AttributeValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Write the payload without the tag byte.
    pub fn encode_value(&self, enc: &mut Encoder) -> CodecResult<()> {
        use AttributeValue as V;
        match self {
            V::NoData | V::Unknown => Ok(()),
            V::Data8(b) => b.encode(enc),
            V::Data16(b) => b.encode(enc),
            V::Data24(b) => b.encode(enc),
            V::Data32(b) => b.encode(enc),
            V::Data40(b) => b.encode(enc),
            V::Data48(b) => b.encode(enc),
            V::Data56(b) => b.encode(enc),
            V::Data64(b) => b.encode(enc),
            V::Boolean(b) => b.encode(enc),
            V::Bitmap8(v) | V::Uint8(v) | V::Enum8(v) => v.encode(enc),
            V::Bitmap16(v) | V::Uint16(v) | V::Enum16(v) | V::SemiPrec(v) => v.encode(enc),
            V::Bitmap24(v) | V::Uint24(v) => enc.put_uint((*v).into(), 3, false),
            V::Bitmap32(v) | V::Uint32(v) => v.encode(enc),
            V::Bitmap40(v) | V::Uint40(v) => enc.put_uint(*v, 5, false),
            V::Bitmap48(v) | V::Uint48(v) => enc.put_uint(*v, 6, false),
            V::Bitmap56(v) | V::Uint56(v) => enc.put_uint(*v, 7, false),
            V::Bitmap64(v) | V::Uint64(v) => v.encode(enc),
            V::Int8(v) => v.encode(enc),
            V::Int16(v) => v.encode(enc),
            V::Int24(v) => put_int(enc, (*v).into(), 3),
            V::Int32(v) => v.encode(enc),
            V::Int40(v) => put_int(enc, *v, 5),
            V::Int48(v) => put_int(enc, *v, 6),
            V::Int56(v) => put_int(enc, *v, 7),
            V::Int64(v) => v.encode(enc),
            V::SinglePrec(v) => v.to_bits().encode(enc),
            V::DoublePrec(v) => v.to_bits().encode(enc),
            V::OctetStr(b) => put_string(enc, b, 1),
            V::CharStr(s) => put_string(enc, s.as_bytes(), 1),
            V::LongOctetStr(b) => put_string(enc, b, 2),
            V::LongCharStr(s) => put_string(enc, s.as_bytes(), 2),
            V::Array(c) | V::Set(c) | V::Bag(c) => c.encode(enc),
            V::Struct(members) => {
                enc.put_len(members.len(), 2)?;
                for member in members {
                    member.encode(enc)?;
                }
                Ok(())
            }
            V::TimeOfDay(t) => t.encode(enc),
            V::Date(d) => d.encode(enc),
            V::Utc(v) | V::BacOid(v) => v.encode(enc),
            V::ClusterId(v) | V::AttrId(v) => v.encode(enc),
            V::IeeeAddr(s) => hex::encode_str(enc, 8, s),
            V::SecurityKey(k) => k.encode(enc),
        }
    }

    /// Read the payload of a value whose tag has already been consumed.
    pub fn decode_value(data_type: ZclDataType, dec: &mut Decoder<'_>) -> CodecResult<Self> {
        use AttributeValue as V;
        use ZclDataType as T;
        Ok(match data_type {
            T::NoData => V::NoData,
            T::Data8 => V::Data8(Wire::decode(dec)?),
            T::Data16 => V::Data16(Wire::decode(dec)?),
            T::Data24 => V::Data24(Wire::decode(dec)?),
            T::Data32 => V::Data32(Wire::decode(dec)?),
            T::Data40 => V::Data40(Wire::decode(dec)?),
            T::Data48 => V::Data48(Wire::decode(dec)?),
            T::Data56 => V::Data56(Wire::decode(dec)?),
            T::Data64 => V::Data64(Wire::decode(dec)?),
            T::Boolean => V::Boolean(dec.get_u8()? != 0),
            T::Bitmap8 => V::Bitmap8(dec.get_u8()?),
            T::Bitmap16 => V::Bitmap16(Wire::decode(dec)?),
            T::Bitmap24 => V::Bitmap24(dec.get_uint(3, false)? as u32),
            T::Bitmap32 => V::Bitmap32(Wire::decode(dec)?),
            T::Bitmap40 => V::Bitmap40(dec.get_uint(5, false)?),
            T::Bitmap48 => V::Bitmap48(dec.get_uint(6, false)?),
            T::Bitmap56 => V::Bitmap56(dec.get_uint(7, false)?),
            T::Bitmap64 => V::Bitmap64(Wire::decode(dec)?),
            T::Uint8 => V::Uint8(dec.get_u8()?),
            T::Uint16 => V::Uint16(Wire::decode(dec)?),
            T::Uint24 => V::Uint24(dec.get_uint(3, false)? as u32),
            T::Uint32 => V::Uint32(Wire::decode(dec)?),
            T::Uint40 => V::Uint40(dec.get_uint(5, false)?),
            T::Uint48 => V::Uint48(dec.get_uint(6, false)?),
            T::Uint56 => V::Uint56(dec.get_uint(7, false)?),
            T::Uint64 => V::Uint64(Wire::decode(dec)?),
            T::Int8 => V::Int8(Wire::decode(dec)?),
            T::Int16 => V::Int16(Wire::decode(dec)?),
            T::Int24 => V::Int24(get_int(dec, 3)? as i32),
            T::Int32 => V::Int32(Wire::decode(dec)?),
            T::Int40 => V::Int40(get_int(dec, 5)?),
            T::Int48 => V::Int48(get_int(dec, 6)?),
            T::Int56 => V::Int56(get_int(dec, 7)?),
            T::Int64 => V::Int64(Wire::decode(dec)?),
            T::Enum8 => V::Enum8(dec.get_u8()?),
            T::Enum16 => V::Enum16(Wire::decode(dec)?),
            T::SemiPrec => V::SemiPrec(Wire::decode(dec)?),
            T::SinglePrec => V::SinglePrec(f32::from_bits(Wire::decode(dec)?)),
            T::DoublePrec => V::DoublePrec(f64::from_bits(Wire::decode(dec)?)),
            T::OctetStr => V::OctetStr(get_string(dec, 1)?),
            T::CharStr => V::CharStr(String::from_utf8_lossy(&get_string(dec, 1)?).into_owned()),
            T::LongOctetStr => V::LongOctetStr(get_string(dec, 2)?),
            T::LongCharStr => V::LongCharStr(String::from_utf8_lossy(&get_string(dec, 2)?).into_owned()),
            T::Array => V::Array(Collection::decode(dec)?),
            T::Set => V::Set(Collection::decode(dec)?),
            T::Bag => V::Bag(Collection::decode(dec)?),
            T::Struct => {
                let count = element_count(dec)?;
                let mut members = Vec::with_capacity(count);
                for _ in 0..count {
                    members.push(AttributeValue::decode(dec)?);
                }
                V::Struct(members)
            }
            T::TimeOfDay => V::TimeOfDay(Wire::decode(dec)?),
            T::Date => V::Date(Wire::decode(dec)?),
            T::Utc => V::Utc(Wire::decode(dec)?),
            T::ClusterId => V::ClusterId(Wire::decode(dec)?),
            T::AttrId => V::AttrId(Wire::decode(dec)?),
            T::BacOid => V::BacOid(Wire::decode(dec)?),
            T::IeeeAddr => V::IeeeAddr(hex::decode_str(dec, 8)?),
            T::SecurityKey => V::SecurityKey(Wire::decode(dec)?),
            T::Unknown => V::Unknown,
        })
    }
}

/// Tag byte followed by the payload.
impl Wire for AttributeValue {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.data_type().encode(enc)?;
        self.encode_value(enc)
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let data_type = ZclDataType::decode(dec)?;
        AttributeValue::decode_value(data_type, dec)
    }
}

impl Wire for Collection {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        check_element_type(self.element_type)?;
        self.element_type.encode(enc)?;
        enc.put_len(self.elements.len(), 2)?;
        for element in &self.elements {
            if element.data_type() != self.element_type {
                return Err(CodecError::UnsupportedVariant {
                    kind: "collection element",
                    value: u8::from(element.data_type()).into(),
                });
            }
            element.encode_value(enc)?;
        }
        Ok(())
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let element_type = ZclDataType::decode(dec)?;
        check_element_type(element_type)?;
        let count = element_count(dec)?;
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(AttributeValue::decode_value(element_type, dec)?);
        }
        Ok(Collection {
            element_type,
            elements,
        })
    }
}

// elements without a payload would let a short count expand without bound
fn check_element_type(element_type: ZclDataType) -> CodecResult<()> {
    match element_type {
        ZclDataType::NoData | ZclDataType::Unknown => Err(CodecError::UnsupportedVariant {
            kind: "collection element",
            value: u8::from(element_type).into(),
        }),
        _ => Ok(()),
    }
}

/// Read a two-byte element count. Every element takes at least one byte.
fn element_count(dec: &mut Decoder<'_>) -> CodecResult<usize> {
    let count = dec.get_len(2)?;
    if count > dec.remaining() {
        return Err(CodecError::Truncated {
            needed: count,
            remaining: dec.remaining(),
        });
    }
    Ok(count)
}

fn put_int(enc: &mut Encoder, value: i64, width: usize) -> CodecResult<()> {
    let bits = width * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if value < min || value > max {
        return Err(CodecError::ValueOverflow {
            value: value as u64,
            width,
        });
    }
    enc.put_uint((value as u64) & ((1u64 << bits) - 1), width, false)
}

fn get_int(dec: &mut Decoder<'_>, width: usize) -> CodecResult<i64> {
    let shift = 64 - width * 8;
    Ok(((dec.get_uint(width, false)? << shift) as i64) >> shift)
}

// a length of all ones marks an invalid (absent) string
fn put_string(enc: &mut Encoder, bytes: &[u8], width: usize) -> CodecResult<()> {
    let invalid = (1usize << (width * 8)) - 1;
    if bytes.len() >= invalid {
        return Err(CodecError::LengthOverflow {
            len: bytes.len(),
            width,
        });
    }
    enc.put_len(bytes.len(), width)?;
    enc.put_bytes(bytes);
    Ok(())
}

fn get_string(dec: &mut Decoder<'_>, width: usize) -> CodecResult<Vec<u8>> {
    let len = dec.get_len(width)?;
    if len == (1usize << (width * 8)) - 1 {
        return Ok(Vec::new());
    }
    Ok(dec.take(len)?.to_vec())
}
