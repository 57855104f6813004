pub mod error;
pub mod iter;
pub mod lib;
pub mod node;
pub mod quicklist;

use crate::data_structure::listpack::LP_HDR_SIZE;

const QL_FILL_BITS: i32 = 16;
const QL_COMP_BITS: u32 = 16;
pub const COMPRESS_MAX: u32 = (1 << QL_COMP_BITS) - 1;
pub const FILL_MAX: i32 = (1 << (QL_FILL_BITS - 1)) - 1;

/// quicklist node encodings
pub const QUICKLIST_NODE_ENCODING_RAW: u32 = 1;
pub const QUICKLIST_NODE_ENCODING_LZF: u32 = 2;

/// quicklist node container formats
pub const QUICKLIST_NODE_CONTAINER_PLAIN: u32 = 1;
pub const QUICKLIST_NODE_CONTAINER_PACKED: u32 = 2;

const MIN_COMPRESS_BYTES: usize = 48;
const MIN_COMPRESS_IMPROVE: usize = 8;

const SIZE_SAFETY_LIMIT: usize = 8192;
const SIZE_ESTIMATE_OVERHEAD: usize = 8;

/// listpack header plus terminator, counted once when two nodes merge
const LP_MERGE_OVERHEAD: usize = 7;

pub const DEFAULT_PACKED_THRESHOLD: usize = 1 << 30;
pub const MAX_PACKED_THRESHOLD: usize = (1 << 32) - (1 << 20);

const OPTIMIZATION_LEVEL: [usize; 5] = [4096, 8192, 16384, 32768, 65536];

/// Byte ceiling of a node for a negative fill level, -1 => 4 KiB up to -5 => 64 KiB.
pub fn quicklist_node_neg_fill_limit(fill: i32) -> usize {
    debug_assert!(fill < 0);
    let level = (fill.unsigned_abs() as usize - 1).min(OPTIMIZATION_LEVEL.len() - 1);
    OPTIMIZATION_LEVEL[level]
}

/// (byte limit, entry limit); the side that does not apply is MAX.
pub fn quicklist_node_limit(fill: i32) -> (usize, u32) {
    if fill >= 0 {
        (usize::MAX, fill.max(1) as u32)
    } else {
        (quicklist_node_neg_fill_limit(fill), u32::MAX)
    }
}

pub fn quicklist_node_exceed_limit(fill: i32, new_sz: usize, new_count: u32) -> bool {
    let (sz_limit, count_limit) = quicklist_node_limit(fill);
    if sz_limit != usize::MAX {
        new_sz > sz_limit
    } else {
        new_sz > SIZE_SAFETY_LIMIT || new_count > count_limit
    }
}

/// Upper bound on the listpack size of a node holding just one `sz` byte value:
/// header, terminator, entry encoding and backlen.
pub fn single_entry_node_size(sz: usize) -> usize {
    sz + SIZE_ESTIMATE_OVERHEAD + LP_HDR_SIZE + 1
}

/// A large element never shares a node: it gets a plain node of its own.
/// That covers every value whose one-entry packed node would break the budget.
pub fn is_large_element(sz: usize, fill: i32, packed_threshold: usize) -> bool {
    if sz >= packed_threshold {
        return true;
    }
    let node_sz = single_entry_node_size(sz);
    if fill >= 0 {
        node_sz > SIZE_SAFETY_LIMIT
    } else {
        node_sz > quicklist_node_neg_fill_limit(fill)
    }
}
