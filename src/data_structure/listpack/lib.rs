use crate::data_structure::listpack::error::ListPackError;
use crate::data_structure::listpack::*;

pub fn lp_set_total_bytes(p: &mut [u8], v: u32) {
    let bytes = v.to_le_bytes();
    p[..4].copy_from_slice(&bytes);
}

pub fn lp_set_num_elements(p: &mut [u8], v: u16) {
    let bytes = v.to_le_bytes();
    p[4] = bytes[0];
    p[5] = bytes[1];
}

pub fn lp_get_total_bytes(p: &[u8]) -> usize {
    u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as usize
}

pub fn lp_get_num_elements(p: &[u8]) -> u16 {
    u16::from_le_bytes([p[4], p[5]])
}

/// Parses `s` as an i64 only when `s` is exactly the canonical decimal form of
/// that integer: no sign other than a leading '-', no leading zeros, no spaces.
pub fn string_to_int(s: &[u8]) -> Option<i64> {
    if s.is_empty() || s.len() >= LONG_STR_SIZE {
        return None;
    }
    if s == b"0" {
        return Some(0);
    }
    let (negative, digits) = match s[0] {
        b'-' => (true, &s[1..]),
        _ => (false, s),
    };
    match digits.first() {
        Some(b'1'..=b'9') => {}
        _ => return None,
    }

    let mut v: u64 = 0;
    for &c in digits {
        if !c.is_ascii_digit() {
            return None;
        }
        v = v.checked_mul(10)?.checked_add((c - b'0') as u64)?;
    }

    if negative {
        if v > (i64::MAX as u64) + 1 {
            return None;
        }
        Some((v as i64).wrapping_neg())
    } else {
        if v > i64::MAX as u64 {
            return None;
        }
        Some(v as i64)
    }
}

pub fn encode_integer(v: i64, buf: &mut Vec<u8>) {
    if (0..=127).contains(&v) {
        buf.push(v as u8 | LP_ENCODING_7BIT_UINT);
    } else if (INT_13_MIN..=INT_13_MAX).contains(&v) {
        let uv = (if v < 0 { (1 << 13) + v } else { v }) as u16;
        buf.push((uv >> 8) as u8 | LP_ENCODING_13BIT_INT);
        buf.push(uv as u8);
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&v) {
        buf.push(LP_ENCODING_16BIT_INT);
        buf.extend_from_slice(&(v as i16).to_le_bytes());
    } else if (INT_24_MIN..=INT_24_MAX).contains(&v) {
        buf.push(LP_ENCODING_24BIT_INT);
        buf.extend_from_slice(&(v as i32).to_le_bytes()[..3]);
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&v) {
        buf.push(LP_ENCODING_32BIT_INT);
        buf.extend_from_slice(&(v as i32).to_le_bytes());
    } else {
        buf.push(LP_ENCODING_64BIT_INT);
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_string(s: &[u8], buf: &mut Vec<u8>) {
    let len = s.len();
    if len < 64 {
        buf.push(len as u8 | LP_ENCODING_6BIT_STR);
    } else if len < 4096 {
        buf.push((len >> 8) as u8 | LP_ENCODING_12BIT_STR);
        buf.push(len as u8);
    } else {
        buf.push(LP_ENCODING_32BIT_STR);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
    buf.extend_from_slice(s);
}

pub fn backlen_size(l: usize) -> usize {
    if l <= 127 {
        1
    } else if l < 16383 {
        2
    } else if l < 2097151 {
        3
    } else if l < 268435455 {
        4
    } else {
        5
    }
}

/// Writes `l` as 7 bit groups, most significant first. Every byte but the
/// leftmost carries the continuation bit so the value can be read backwards.
pub fn encode_backlen(l: usize, buf: &mut Vec<u8>) {
    let size = backlen_size(l);
    for i in (0..size).rev() {
        let group = ((l >> (7 * i)) & 127) as u8;
        if i == size - 1 {
            buf.push(group);
        } else {
            buf.push(group | 128);
        }
    }
}

/// Reads a backlen whose last byte sits at `p`. Returns the decoded length
/// and the number of bytes the backlen occupies.
pub fn decode_backlen(data: &[u8], mut p: usize) -> Option<(usize, usize)> {
    let mut val = 0usize;
    let mut shift = 0;
    let mut n = 0;
    loop {
        let b = *data.get(p)?;
        val |= ((b & 127) as usize) << shift;
        n += 1;
        if b & 128 == 0 {
            break;
        }
        if n == LP_MAX_BACKLEN_SIZE {
            return None;
        }
        shift += 7;
        p = p.checked_sub(1)?;
    }
    Some((val, n))
}

/// Builds `<encoding+data><backlen>` for `value`, storing integers compactly.
pub fn encode_entry(value: &[u8]) -> Result<Vec<u8>, ListPackError> {
    let capacity = value.len() + 5 + LP_MAX_BACKLEN_SIZE;
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| ListPackError::AllocFailed(capacity))?;
    match string_to_int(value) {
        Some(v) => encode_integer(v, &mut buf),
        None => {
            if value.len() > u32::MAX as usize {
                return Err(ListPackError::OutOfRange(value.len()));
            }
            encode_string(value, &mut buf)
        }
    }
    let l = buf.len();
    encode_backlen(l, &mut buf);
    Ok(buf)
}

/// Size of `<encoding+data>` of the entry starting at `pos`.
pub fn entry_data_size(data: &[u8], pos: usize) -> Result<usize, ListPackError> {
    let corrupted = || ListPackError::Corrupted(format!("bad entry at {pos}"));
    let b = *data.get(pos).ok_or_else(corrupted)?;
    let size = if b & LP_ENCODING_7BIT_UINT_MASK == LP_ENCODING_7BIT_UINT {
        1
    } else if b & LP_ENCODING_6BIT_STR_MASK == LP_ENCODING_6BIT_STR {
        1 + (b & 0x3f) as usize
    } else if b & LP_ENCODING_13BIT_INT_MASK == LP_ENCODING_13BIT_INT {
        2
    } else if b & LP_ENCODING_12BIT_STR_MASK == LP_ENCODING_12BIT_STR {
        let low = *data.get(pos + 1).ok_or_else(corrupted)?;
        2 + ((((b & 0x0f) as usize) << 8) | low as usize)
    } else {
        match b {
            LP_ENCODING_16BIT_INT => 3,
            LP_ENCODING_24BIT_INT => 4,
            LP_ENCODING_32BIT_INT => 5,
            LP_ENCODING_64BIT_INT => 9,
            LP_ENCODING_32BIT_STR => {
                let len = data.get(pos + 1..pos + 5).ok_or_else(corrupted)?;
                5 + u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize
            }
            _ => return Err(corrupted()),
        }
    };
    Ok(size)
}

/// Size of the whole entry at `pos`, backlen included.
pub fn entry_size(data: &[u8], pos: usize) -> Result<usize, ListPackError> {
    let l = entry_data_size(data, pos)?;
    Ok(l + backlen_size(l))
}

fn sign_extend(bytes: &[u8]) -> i64 {
    let mut buf = if bytes[bytes.len() - 1] & 0x80 != 0 {
        [0xff; 8]
    } else {
        [0; 8]
    };
    buf[..bytes.len()].copy_from_slice(bytes);
    i64::from_le_bytes(buf)
}

/// Decodes the entry at `pos`; strings borrow from `data`.
pub fn decode_entry(data: &[u8], pos: usize) -> LpValue<'_> {
    let b = data[pos];
    if b & LP_ENCODING_7BIT_UINT_MASK == LP_ENCODING_7BIT_UINT {
        LpValue::Int((b & 0x7f) as i64)
    } else if b & LP_ENCODING_6BIT_STR_MASK == LP_ENCODING_6BIT_STR {
        let len = (b & 0x3f) as usize;
        LpValue::Str(&data[pos + 1..pos + 1 + len])
    } else if b & LP_ENCODING_13BIT_INT_MASK == LP_ENCODING_13BIT_INT {
        let uv = (((b & 0x1f) as i64) << 8) | data[pos + 1] as i64;
        if uv >= 1 << 12 {
            LpValue::Int(uv - (1 << 13))
        } else {
            LpValue::Int(uv)
        }
    } else if b & LP_ENCODING_12BIT_STR_MASK == LP_ENCODING_12BIT_STR {
        let len = (((b & 0x0f) as usize) << 8) | data[pos + 1] as usize;
        LpValue::Str(&data[pos + 2..pos + 2 + len])
    } else {
        match b {
            LP_ENCODING_16BIT_INT => LpValue::Int(sign_extend(&data[pos + 1..pos + 3])),
            LP_ENCODING_24BIT_INT => LpValue::Int(sign_extend(&data[pos + 1..pos + 4])),
            LP_ENCODING_32BIT_INT => LpValue::Int(sign_extend(&data[pos + 1..pos + 5])),
            LP_ENCODING_64BIT_INT => LpValue::Int(sign_extend(&data[pos + 1..pos + 9])),
            _ => {
                let len = u32::from_le_bytes([
                    data[pos + 1],
                    data[pos + 2],
                    data[pos + 3],
                    data[pos + 4],
                ]) as usize;
                LpValue::Str(&data[pos + 5..pos + 5 + len])
            }
        }
    }
}

/// A decoded listpack element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LpValue<'a> {
    Str(&'a [u8]),
    Int(i64),
}

impl LpValue<'_> {
    /// Byte length of the value as a string; integers count their decimal digits.
    pub fn len(&self) -> usize {
        match self {
            LpValue::Str(s) => s.len(),
            LpValue::Int(v) => v.to_string().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LpValue::Str(s) if s.is_empty())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            LpValue::Str(s) => s.to_vec(),
            LpValue::Int(v) => v.to_string().into_bytes(),
        }
    }

    /// Integer aware equality against a raw byte string.
    pub fn eq_bytes(&self, other: &[u8]) -> bool {
        match self {
            LpValue::Str(s) => *s == other,
            LpValue::Int(v) => string_to_int(other) == Some(*v),
        }
    }
}
