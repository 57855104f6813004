use std::fmt;

use crate::data_structure::listpack::error::ListPackError;
use crate::data_structure::listpack::lib::{
    backlen_size, decode_backlen, decode_entry, encode_entry, entry_data_size, entry_size,
    lp_get_num_elements, lp_get_total_bytes, lp_set_num_elements, lp_set_total_bytes, LpValue,
};
use crate::data_structure::listpack::{LP_EOF, LP_HDR_NUMELE_UNKNOWN, LP_HDR_SIZE};

/// Where to put a new element relative to an existing position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LpWhere {
    Before,
    After,
}

/// A contiguous buffer of variable length entries:
/// `<total bytes:u32><count:u16><entry>...<0xFF>`.
///
/// Positions handed out by `first`, `next`, `seek` and friends are byte
/// offsets into the buffer and stay valid until the next mutation.
#[derive(Clone, PartialEq, Eq)]
pub struct ListPack {
    data: Vec<u8>,
}

impl Default for ListPack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl ListPack {
    pub fn new() -> Self {
        let bytes = LP_HDR_SIZE + 1;
        let mut data = vec![0u8; bytes];
        lp_set_total_bytes(&mut data, bytes as u32);
        lp_set_num_elements(&mut data, 0);
        data[bytes - 1] = LP_EOF;
        Self { data }
    }

    /// Wraps raw listpack bytes, rejecting anything that does not walk cleanly.
    pub fn from_vec(data: Vec<u8>) -> Result<Self, ListPackError> {
        let lp = Self { data };
        lp.validate_integrity(true)?;
        Ok(lp)
    }

    /// Wraps bytes copied from a listpack already known to be well formed;
    /// only the header and terminator are checked.
    pub(crate) fn from_vec_unchecked(data: Vec<u8>) -> Result<Self, ListPackError> {
        let lp = Self { data };
        lp.validate_integrity(false)?;
        Ok(lp)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total size of the buffer in bytes.
    pub fn bytes(&self) -> usize {
        self.data.len()
    }

    pub fn length(&self) -> usize {
        let num = lp_get_num_elements(&self.data);
        if num != LP_HDR_NUMELE_UNKNOWN {
            return num as usize;
        }
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data[LP_HDR_SIZE] == LP_EOF
    }

    pub fn validate_integrity(&self, deep: bool) -> Result<(), ListPackError> {
        let bytes = self.data.len();
        if bytes < LP_HDR_SIZE + 1 {
            return Err(ListPackError::Corrupted(format!("{bytes} bytes is too short")));
        }
        if lp_get_total_bytes(&self.data) != bytes {
            return Err(ListPackError::Corrupted(format!(
                "header says {} bytes, buffer has {bytes}",
                lp_get_total_bytes(&self.data)
            )));
        }
        if self.data[bytes - 1] != LP_EOF {
            return Err(ListPackError::Corrupted("missing terminator".to_string()));
        }
        if !deep {
            return Ok(());
        }

        let mut pos = LP_HDR_SIZE;
        let mut count = 0usize;
        while self.data[pos] != LP_EOF {
            let l = entry_data_size(&self.data, pos)?;
            let size = l + backlen_size(l);
            if pos + size > bytes - 1 {
                return Err(ListPackError::Corrupted(format!("entry at {pos} overflows")));
            }
            match decode_backlen(&self.data, pos + size - 1) {
                Some((back, n)) if back == l && n == backlen_size(l) => {}
                _ => {
                    return Err(ListPackError::Corrupted(format!("bad backlen at {pos}")));
                }
            }
            pos += size;
            count += 1;
        }
        if pos != bytes - 1 {
            return Err(ListPackError::Corrupted(format!("early terminator at {pos}")));
        }
        let num = lp_get_num_elements(&self.data);
        if num != LP_HDR_NUMELE_UNKNOWN && num as usize != count {
            return Err(ListPackError::Corrupted(format!(
                "header says {num} entries, found {count}"
            )));
        }
        Ok(())
    }

    pub fn first(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(LP_HDR_SIZE)
        }
    }

    pub fn last(&self) -> Option<usize> {
        self.prev(self.data.len() - 1)
    }

    pub fn next(&self, pos: usize) -> Option<usize> {
        let next = pos + entry_size(&self.data, pos).ok()?;
        if *self.data.get(next)? == LP_EOF {
            None
        } else {
            Some(next)
        }
    }

    pub fn prev(&self, pos: usize) -> Option<usize> {
        if pos <= LP_HDR_SIZE {
            return None;
        }
        let (l, n) = decode_backlen(&self.data, pos - 1)?;
        pos.checked_sub(n + l)
    }

    /// Position of the element at `index`; negative indexes count from the tail.
    pub fn seek(&self, index: i64) -> Option<usize> {
        let len = self.length() as i64;
        let index = if index < 0 { len + index } else { index };
        if index < 0 || index >= len {
            return None;
        }

        if index < len / 2 {
            let mut pos = self.first()?;
            for _ in 0..index {
                pos = self.next(pos)?;
            }
            Some(pos)
        } else {
            let mut pos = self.last()?;
            for _ in 0..(len - 1 - index) {
                pos = self.prev(pos)?;
            }
            Some(pos)
        }
    }

    pub fn get(&self, pos: usize) -> Option<LpValue<'_>> {
        if pos < LP_HDR_SIZE || pos >= self.data.len() - 1 {
            return None;
        }
        Some(decode_entry(&self.data, pos))
    }

    /// Encoded size of the element at `pos`, backlen included.
    pub fn entry_bytes(&self, pos: usize) -> Option<usize> {
        self.check_pos(pos).ok()?;
        entry_size(&self.data, pos).ok()
    }

    pub fn compare(&self, pos: usize, s: &[u8]) -> bool {
        self.get(pos).is_some_and(|v| v.eq_bytes(s))
    }

    fn check_pos(&self, pos: usize) -> Result<(), ListPackError> {
        if pos < LP_HDR_SIZE || pos >= self.data.len() - 1 {
            return Err(ListPackError::OutOfRange(pos));
        }
        Ok(())
    }

    fn reserve(&mut self, additional: usize) -> Result<(), ListPackError> {
        self.data
            .try_reserve(additional)
            .map_err(|_| ListPackError::AllocFailed(additional))
    }

    fn set_count(&mut self, count: usize) {
        let num = if count < LP_HDR_NUMELE_UNKNOWN as usize {
            count as u16
        } else {
            LP_HDR_NUMELE_UNKNOWN
        };
        lp_set_num_elements(&mut self.data, num);
    }

    fn sync_total_bytes(&mut self) {
        let bytes = self.data.len() as u32;
        lp_set_total_bytes(&mut self.data, bytes);
    }

    fn insert_at(&mut self, at: usize, value: &[u8]) -> Result<usize, ListPackError> {
        let entry = encode_entry(value)?;
        let count = self.length();
        self.reserve(entry.len())?;
        self.data.splice(at..at, entry);
        self.sync_total_bytes();
        self.set_count(count + 1);
        Ok(at)
    }

    pub fn append(&mut self, value: &[u8]) -> Result<(), ListPackError> {
        let eof = self.data.len() - 1;
        self.insert_at(eof, value).map(|_| ())
    }

    pub fn prepend(&mut self, value: &[u8]) -> Result<(), ListPackError> {
        self.insert_at(LP_HDR_SIZE, value).map(|_| ())
    }

    /// Inserts `value` next to the element at `pos` and returns the new
    /// element's position.
    pub fn insert(
        &mut self,
        pos: usize,
        value: &[u8],
        where_: LpWhere,
    ) -> Result<usize, ListPackError> {
        self.check_pos(pos)?;
        let at = match where_ {
            LpWhere::Before => pos,
            LpWhere::After => pos + entry_size(&self.data, pos)?,
        };
        self.insert_at(at, value)
    }

    pub fn replace(&mut self, pos: usize, value: &[u8]) -> Result<(), ListPackError> {
        self.check_pos(pos)?;
        let old = entry_size(&self.data, pos)?;
        let entry = encode_entry(value)?;
        if entry.len() > old {
            self.reserve(entry.len() - old)?;
        }
        self.data.splice(pos..pos + old, entry);
        self.sync_total_bytes();
        Ok(())
    }

    /// Removes the element at `pos`, returning the position of the element
    /// that followed it.
    pub fn delete(&mut self, pos: usize) -> Result<Option<usize>, ListPackError> {
        self.check_pos(pos)?;
        let size = entry_size(&self.data, pos)?;
        let count = self.length();
        self.data.drain(pos..pos + size);
        self.sync_total_bytes();
        self.set_count(count - 1);
        if self.data[pos] == LP_EOF {
            Ok(None)
        } else {
            Ok(Some(pos))
        }
    }

    /// Deletes up to `num` elements starting at `index` and returns how many
    /// were removed.
    pub fn delete_range(&mut self, index: i64, num: usize) -> Result<usize, ListPackError> {
        let Some(start) = self.seek(index) else {
            return Ok(0);
        };
        let count = self.length();
        let mut end = start;
        let mut deleted = 0;
        while deleted < num && self.data[end] != LP_EOF {
            end += entry_size(&self.data, end)?;
            deleted += 1;
        }
        self.data.drain(start..end);
        self.sync_total_bytes();
        self.set_count(count - deleted);
        Ok(deleted)
    }

    /// Appends every element of `other` to this listpack.
    pub fn merge(&mut self, other: &ListPack) -> Result<(), ListPackError> {
        let extra = other.data.len() - LP_HDR_SIZE - 1;
        let count = self.length() + other.length();
        self.reserve(extra)?;
        let eof = self.data.len() - 1;
        self.data.truncate(eof);
        self.data.extend_from_slice(&other.data[LP_HDR_SIZE..]);
        self.sync_total_bytes();
        self.set_count(count);
        Ok(())
    }
}
