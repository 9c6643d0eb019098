// MIT License - Copyright (c) 2026 Peter Wright
// Hex-string addresses ("0x…") carried as little-endian integers on the wire

use super::{CodecError, CodecResult, Decoder, Encoder};

/// Format `value` as `0x` followed by exactly `2 * width` lowercase digits.
pub fn format(value: u64, width: usize) -> String {
    format!("0x{:0w$x}", value, w = width * 2)
}

/// Parse a `0x`-prefixed hex string of at most `2 * width` digits.
pub fn parse(s: &str, width: usize) -> CodecResult<u64> {
    let digits = width * 2;
    let invalid = || CodecError::InvalidHex {
        value: s.to_string(),
        digits,
    };
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    if body.is_empty() || body.len() > digits || body.len() > 16 {
        return Err(invalid());
    }
    u64::from_str_radix(body, 16).map_err(|_| invalid())
}

pub fn encode_str(enc: &mut Encoder, width: usize, value: &str) -> CodecResult<()> {
    let raw = parse(value, width)?;
    enc.put_uint(raw, width, false)
}

pub fn decode_str(dec: &mut Decoder<'_>, width: usize) -> CodecResult<String> {
    Ok(format(dec.get_uint(width, false)?, width))
}

pub fn encode_list(enc: &mut Encoder, size_width: usize, width: usize, values: &[String]) -> CodecResult<()> {
    enc.put_len(values.len(), size_width)?;
    for value in values {
        encode_str(enc, width, value)?;
    }
    Ok(())
}

pub fn decode_list(dec: &mut Decoder<'_>, size_width: usize, width: usize) -> CodecResult<Vec<String>> {
    let count = dec.get_len(size_width)?;
    let mut out = Vec::with_capacity(count.min(dec.remaining()));
    for _ in 0..count {
        out.push(decode_str(dec, width)?);
    }
    Ok(out)
}
