// MIT License - Copyright (c) 2026 Peter Wright
// Declarative binary codec for ZNP and ZCL records

//! Binary codec.
//!
//! Every record that crosses the serial link implements [`Wire`]. Most
//! implementations are generated by [`wire_struct!`](crate::wire_struct),
//! which reads a field list with per-field wire annotations and derives both
//! directions from it:
//!
//! | annotation            | meaning                                                     |
//! |-----------------------|-------------------------------------------------------------|
//! | *(none)*              | the field's own [`Wire`] impl (integers are little-endian)   |
//! | `[be]`                | big-endian integer                                          |
//! | `[bound N]`           | integer carried in `N` bytes instead of its in-memory width |
//! | `[hex N]`             | `"0x…"` string carried as an `N`-byte little-endian integer |
//! | `[size N]`            | sequence with an `N`-byte count prefix                      |
//! | `[size N, hex M]`     | prefixed list of hex strings                                |
//! | `[when (a == 3)]`     | `Option` field present only when the predicate holds        |
//! | `[transient]`         | in-memory only                                              |
//!
//! A `Vec` or `String` without `[size N]` consumes the rest of the buffer on
//! decode and is written without a prefix on encode.
//!
//! Bit-packed fields are declared as a `bits(carrier) { … }` group. Types
//! whose layout depends on runtime data (ZCL attribute values) implement
//! [`Wire`] by hand.

#[macro_use]
mod macros;
pub mod hex;

use std::fmt;

/// Errors raised while encoding or decoding a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} byte(s), {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("unsupported {kind} variant: {value:#x}")]
    UnsupportedVariant { kind: &'static str, value: u64 },

    #[error("invalid hex address {value:?} (expected 0x and at most {digits} hex digits)")]
    InvalidHex { value: String, digits: usize },

    #[error("conditional field is required but missing")]
    MissingField,

    #[error("length {len} does not fit in a {width}-byte prefix")]
    LengthOverflow { len: usize, width: usize },

    #[error("value {value:#x} does not fit in {width} byte(s)")]
    ValueOverflow { value: u64, width: usize },

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("field `{field}` at offset {offset}: {source}")]
    Field {
        field: &'static str,
        offset: usize,
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Attach the name and byte offset of the field being processed.
    pub fn in_field(self, field: &'static str, offset: usize) -> Self {
        CodecError::Field {
            field,
            offset,
            source: Box::new(self),
        }
    }

    /// The innermost error, with field context stripped.
    pub fn root_cause(&self) -> &CodecError {
        match self {
            CodecError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Growable output buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write the low `width` bytes of `value`.
    pub fn put_uint(&mut self, value: u64, width: usize, big_endian: bool) -> CodecResult<()> {
        if width < 8 && value >> (width * 8) != 0 {
            return Err(CodecError::ValueOverflow { value, width });
        }
        let le = value.to_le_bytes();
        // widths beyond 8 bytes are zero-padded on the high side
        let padding = std::iter::repeat(0u8).take(width.saturating_sub(8));
        if big_endian {
            self.buf.extend(padding);
            self.buf.extend(le[..width.min(8)].iter().rev());
        } else {
            self.buf.extend_from_slice(&le[..width.min(8)]);
            self.buf.extend(padding);
        }
        Ok(())
    }

    /// Write a length prefix of `width` bytes.
    pub fn put_len(&mut self, len: usize, width: usize) -> CodecResult<()> {
        self.put_uint(len as u64, width, false)
            .map_err(|_| CodecError::LengthOverflow { len, width })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an input buffer that tracks the absolute byte offset.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn get_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a `width`-byte unsigned integer. Bytes past the eighth are dropped.
    pub fn get_uint(&mut self, width: usize, big_endian: bool) -> CodecResult<u64> {
        let bytes = self.take(width)?;
        let mut value = 0u64;
        if big_endian {
            for b in bytes.iter().skip(width.saturating_sub(8)) {
                value = (value << 8) | u64::from(*b);
            }
        } else {
            for (i, b) in bytes.iter().take(8).enumerate() {
                value |= u64::from(*b) << (8 * i);
            }
        }
        Ok(value)
    }

    pub fn get_len(&mut self, width: usize) -> CodecResult<usize> {
        Ok(self.get_uint(width, false)? as usize)
    }
}

/// A value with a fixed wire representation.
pub trait Wire: Sized {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()>;
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self>;
}

/// Encode a record into a fresh buffer.
pub fn encode<T: Wire>(value: &T) -> CodecResult<Vec<u8>> {
    let mut enc = Encoder::new();
    value.encode(&mut enc)?;
    Ok(enc.into_bytes())
}

/// Decode a record from the start of `bytes`. Trailing bytes are ignored.
pub fn decode<T: Wire>(bytes: &[u8]) -> CodecResult<T> {
    T::decode(&mut Decoder::new(bytes))
}

macro_rules! wire_uint {
    ($($t:ty),+) => {
        $(
            impl Wire for $t {
                fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
                    enc.put_bytes(&self.to_le_bytes());
                    Ok(())
                }

                fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
                    let bytes = dec.take(std::mem::size_of::<$t>())?;
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    Ok(<$t>::from_le_bytes(raw))
                }
            }
        )+
    };
}

wire_uint!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Wire for bool {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_u8(u8::from(*self));
        Ok(())
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(dec.get_u8()? != 0)
    }
}

impl<const N: usize> Wire for [u8; N] {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_bytes(self);
        Ok(())
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut out = [0u8; N];
        out.copy_from_slice(dec.take(N)?);
        Ok(out)
    }
}

/// Unprefixed sequence: written as-is, read until the buffer is exhausted.
impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.encode_items(enc)
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let mut out = Vec::new();
        while !dec.is_empty() {
            out.push(T::decode(dec)?);
        }
        Ok(out)
    }
}

impl Wire for String {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_bytes(self.as_bytes());
        Ok(())
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        String::from_utf8(dec.rest().to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Used for conditional fields: `None` cannot be written.
impl<T: Wire> Wire for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        match self {
            Some(v) => v.encode(enc),
            None => Err(CodecError::MissingField),
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        T::decode(dec).map(Some)
    }
}

impl<T: Wire> Wire for Box<T> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        (**self).encode(enc)
    }

    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        T::decode(dec).map(Box::new)
    }
}

/// Element-wise access for length-prefixed sequences.
pub trait Sequence: Sized {
    /// Element count (or byte count for strings) written into the prefix.
    fn count(&self) -> usize;
    fn encode_items(&self, enc: &mut Encoder) -> CodecResult<()>;
    fn decode_items(dec: &mut Decoder<'_>, count: usize) -> CodecResult<Self>;
}

impl<T: Wire> Sequence for Vec<T> {
    fn count(&self) -> usize {
        self.len()
    }

    fn encode_items(&self, enc: &mut Encoder) -> CodecResult<()> {
        for item in self {
            item.encode(enc)?;
        }
        Ok(())
    }

    fn decode_items(dec: &mut Decoder<'_>, count: usize) -> CodecResult<Self> {
        let mut out = Vec::with_capacity(count.min(dec.remaining()));
        for i in 0..count {
            let offset = dec.position();
            out.push(T::decode(dec).map_err(|e| e.in_field(index_label(i), offset))?);
        }
        Ok(out)
    }
}

impl Sequence for String {
    fn count(&self) -> usize {
        self.len()
    }

    fn encode_items(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_bytes(self.as_bytes());
        Ok(())
    }

    fn decode_items(dec: &mut Decoder<'_>, count: usize) -> CodecResult<Self> {
        String::from_utf8(dec.take(count)?.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

fn index_label(i: usize) -> &'static str {
    const LABELS: [&str; 8] = ["[0]", "[1]", "[2]", "[3]", "[4]", "[5]", "[6]", "[7]"];
    LABELS.get(i).copied().unwrap_or("[..]")
}

pub fn encode_prefixed<S: Sequence>(enc: &mut Encoder, width: usize, value: &S) -> CodecResult<()> {
    enc.put_len(value.count(), width)?;
    value.encode_items(enc)
}

pub fn decode_prefixed<S: Sequence>(dec: &mut Decoder<'_>, width: usize) -> CodecResult<S> {
    let count = dec.get_len(width)?;
    S::decode_items(dec, count)
}

/// Unsigned integers that can be carried in a narrower or wider wire slot,
/// and that can serve as bitmask carriers.
pub trait Bounded: Sized {
    fn to_u64(&self) -> u64;
    /// Truncates to the in-memory width.
    fn from_u64(value: u64) -> Self;
}

macro_rules! bounded {
    ($($t:ty),+) => {
        $(
            impl Bounded for $t {
                fn to_u64(&self) -> u64 {
                    *self as u64
                }

                fn from_u64(value: u64) -> Self {
                    value as $t
                }
            }
        )+
    };
}

bounded!(u8, u16, u32, u64);

pub fn encode_bounded<T: Bounded>(
    enc: &mut Encoder,
    width: usize,
    value: &T,
    big_endian: bool,
) -> CodecResult<()> {
    enc.put_uint(value.to_u64(), width, big_endian)
}

pub fn decode_bounded<T: Bounded>(dec: &mut Decoder<'_>, width: usize, big_endian: bool) -> CodecResult<T> {
    Ok(T::from_u64(dec.get_uint(width, big_endian)?))
}

pub fn encode_be<T: Bounded>(enc: &mut Encoder, value: &T) -> CodecResult<()> {
    encode_bounded(enc, std::mem::size_of::<T>(), value, true)
}

pub fn decode_be<T: Bounded>(dec: &mut Decoder<'_>) -> CodecResult<T> {
    decode_bounded(dec, std::mem::size_of::<T>(), true)
}

/// A value that can be packed into a bitmask span.
pub trait BitField: Sized {
    fn to_bits(&self) -> u64;
    fn from_bits(bits: u64) -> CodecResult<Self>;
}

macro_rules! bitfield_uint {
    ($($t:ty),+) => {
        $(
            impl BitField for $t {
                fn to_bits(&self) -> u64 {
                    *self as u64
                }

                fn from_bits(bits: u64) -> CodecResult<Self> {
                    Ok(bits as $t)
                }
            }
        )+
    };
}

bitfield_uint!(u8, u16, u32);

impl BitField for bool {
    fn to_bits(&self) -> u64 {
        u64::from(*self)
    }

    fn from_bits(bits: u64) -> CodecResult<Self> {
        Ok(bits != 0)
    }
}

/// `(carrier & mask) >> trailing_zeros(mask)`
pub fn extract_bits(carrier: u64, mask: u64) -> u64 {
    (carrier & mask) >> mask.trailing_zeros()
}

/// `(carrier & !mask) | ((value << trailing_zeros(mask)) & mask)`
pub fn merge_bits(carrier: u64, mask: u64, value: u64) -> u64 {
    (carrier & !mask) | ((value << mask.trailing_zeros()) & mask)
}

/// Numeric view of a field used by `[when (...)]` predicates.
pub trait CondValue {
    fn cond_value(&self) -> Option<u64>;
}

macro_rules! cond_uint {
    ($($t:ty),+) => {
        $(
            impl CondValue for $t {
                fn cond_value(&self) -> Option<u64> {
                    Some(*self as u64)
                }
            }
        )+
    };
}

cond_uint!(u8, u16, u32, u64);

impl CondValue for bool {
    fn cond_value(&self) -> Option<u64> {
        Some(u64::from(*self))
    }
}

impl<T: CondValue> CondValue for Option<T> {
    fn cond_value(&self) -> Option<u64> {
        self.as_ref().and_then(CondValue::cond_value)
    }
}

/// Hex dump used in log lines.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&::hex::encode(self.0))
    }
}
