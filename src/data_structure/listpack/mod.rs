pub mod error;
pub mod iter;
mod lib;
pub mod listpack;
mod test;

pub use lib::{string_to_int, LpValue};

/// total bytes (u32) + number of elements (u16)
pub const LP_HDR_SIZE: usize = 6;
pub const LP_HDR_NUMELE_UNKNOWN: u16 = u16::MAX;
pub const LP_EOF: u8 = 0xFF;
const LP_MAX_BACKLEN_SIZE: usize = 5;

/// integer encode
const LP_ENCODING_7BIT_UINT: u8 = 0;
const LP_ENCODING_7BIT_UINT_MASK: u8 = 0x80;
const LP_ENCODING_13BIT_INT: u8 = 0xC0;
const LP_ENCODING_13BIT_INT_MASK: u8 = 0xE0;
const LP_ENCODING_16BIT_INT: u8 = 0xF1;
const LP_ENCODING_24BIT_INT: u8 = 0xF2;
const LP_ENCODING_32BIT_INT: u8 = 0xF3;
const LP_ENCODING_64BIT_INT: u8 = 0xF4;

/// string encode
const LP_ENCODING_6BIT_STR: u8 = 0x80;
const LP_ENCODING_6BIT_STR_MASK: u8 = 0xC0;
const LP_ENCODING_12BIT_STR: u8 = 0xE0;
const LP_ENCODING_12BIT_STR_MASK: u8 = 0xF0;
const LP_ENCODING_32BIT_STR: u8 = 0xF0;

const INT_13_MAX: i64 = 4095;
const INT_13_MIN: i64 = -4096;
const INT_24_MAX: i64 = 0x7fffff;
const INT_24_MIN: i64 = -INT_24_MAX - 1;

/// longest decimal form of an i64 plus one
const LONG_STR_SIZE: usize = 21;
