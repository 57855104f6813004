use std::ptr::NonNull;

use bytes::Bytes;
use tracing::warn;

use crate::data_structure::listpack::{string_to_int, LpValue};
use crate::data_structure::quicklist::error::{QuickListError, Result};
use crate::data_structure::quicklist::node::{node_mut, node_ref, QuickListNode};
use crate::data_structure::quicklist::quicklist::QuickList;

/// A list element as handed out to callers: either bytes or an integer the
/// listpack stored in its integer encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListValue {
    Str(Bytes),
    Int(i64),
}

impl ListValue {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ListValue::Str(s) => s.clone(),
            ListValue::Int(v) => Bytes::from(v.to_string()),
        }
    }

    /// Length of the string form in bytes.
    pub fn sz(&self) -> usize {
        match self {
            ListValue::Str(s) => s.len(),
            ListValue::Int(v) => v.to_string().len(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ListValue::Int(v) => Some(*v),
            ListValue::Str(_) => None,
        }
    }

    /// Integer aware comparison: `Int(12)` equals `b"12"` but not `b"012"`.
    pub fn compare(&self, other: &[u8]) -> bool {
        match self {
            ListValue::Str(s) => s.as_ref() == other,
            ListValue::Int(v) => string_to_int(other) == Some(*v),
        }
    }
}

impl From<LpValue<'_>> for ListValue {
    fn from(value: LpValue<'_>) -> Self {
        match value {
            LpValue::Str(s) => ListValue::Str(Bytes::copy_from_slice(s)),
            LpValue::Int(v) => ListValue::Int(v),
        }
    }
}

impl From<&[u8]> for ListValue {
    fn from(value: &[u8]) -> Self {
        match string_to_int(value) {
            Some(v) => ListValue::Int(v),
            None => ListValue::Str(Bytes::copy_from_slice(value)),
        }
    }
}

/// Iteration order: `StartHead` walks towards the tail, `StartTail` towards
/// the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    StartHead,
    StartTail,
}

/// A located element. It refers back to its node, so it is only good until
/// the list is next mutated.
#[derive(Clone, Debug)]
pub struct QuickListEntry {
    pub(crate) node: NonNull<QuickListNode>,
    pub(crate) offset: usize,
    pub(crate) value: ListValue,
}

impl QuickListEntry {
    /// Offset of the element inside its node.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn value(&self) -> &ListValue {
        &self.value
    }

    pub fn into_value(self) -> ListValue {
        self.value
    }

    pub fn compare(&self, other: &[u8]) -> bool {
        self.value.compare(other)
    }
}

pub struct QuickListIter<'a> {
    quicklist: &'a mut QuickList,
    current: Option<NonNull<QuickListNode>>,
    /// position of the last returned element inside `current`
    zi: Option<usize>,
    /// index inside `current`, negative when walking backwards
    offset: i64,
    direction: Direction,
}

impl QuickList {
    pub fn iter(&mut self, direction: Direction) -> QuickListIter<'_> {
        let (current, offset) = match direction {
            Direction::StartHead => (self.head, 0),
            Direction::StartTail => (self.tail, -1),
        };
        QuickListIter {
            quicklist: self,
            current,
            zi: None,
            offset,
            direction,
        }
    }

    /// Iterator whose first element is the one at `idx`; `None` when `idx`
    /// is out of range.
    pub fn iter_at_idx(&mut self, direction: Direction, idx: i64) -> Option<QuickListIter<'_>> {
        let (node, offset) = self.locate(idx)?;
        let offset = match direction {
            Direction::StartHead => offset as i64,
            Direction::StartTail => offset as i64 - node_ref(node).count as i64,
        };
        Some(QuickListIter {
            quicklist: self,
            current: Some(node),
            zi: None,
            offset,
            direction,
        })
    }
}

impl QuickListIter<'_> {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn release_current(&mut self) {
        if let Some(node) = self.current {
            if let Err(e) = self.quicklist.compress(Some(node)) {
                warn!("recompress node after iteration fail: {}", e);
            }
        }
    }

    pub fn rewind(&mut self) {
        self.release_current();
        self.current = self.quicklist.head;
        self.direction = Direction::StartHead;
        self.offset = 0;
        self.zi = None;
    }

    pub fn rewind_tail(&mut self) {
        self.release_current();
        self.current = self.quicklist.tail;
        self.direction = Direction::StartTail;
        self.offset = -1;
        self.zi = None;
    }

    /// Deletes the element last returned by `next`. The following call to
    /// `next` yields the element after it in iteration order.
    pub fn del_entry(&mut self, entry: &QuickListEntry) -> Result<()> {
        if self.current != Some(entry.node) || self.zi.is_none() {
            return Err(QuickListError::StaleEntry);
        }
        let prev = node_ref(entry.node).prev;
        let next = node_ref(entry.node).next;
        let deleted_node = self.quicklist.del_index(entry.node, entry.offset)?;
        self.zi = None;

        if deleted_node {
            match self.direction {
                Direction::StartHead => {
                    self.current = next;
                    self.offset = 0;
                }
                Direction::StartTail => {
                    self.current = prev;
                    self.offset = -1;
                }
            }
        }
        Ok(())
    }
}

impl Iterator for QuickListIter<'_> {
    type Item = Result<QuickListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let forward = self.direction == Direction::StartHead;
        loop {
            let current = self.current?;
            let node = node_mut(current);
            if let Err(e) = node.decompress_for_use() {
                return Some(Err(e));
            }

            let found = match self.zi {
                None => node.seek(self.offset),
                Some(zi) => {
                    self.offset += if forward { 1 } else { -1 };
                    node.step(zi, forward)
                }
            };
            self.zi = found;

            if let Some(pos) = found {
                let offset = if self.offset < 0 {
                    node.count as i64 + self.offset
                } else {
                    self.offset
                };
                let Some(value) = node.value_at_pos(pos) else {
                    return Some(Err(QuickListError::NodeNotPacked));
                };
                return Some(Ok(QuickListEntry {
                    node: current,
                    offset: offset as usize,
                    value,
                }));
            }

            // current node exhausted, fold it back and move on
            if let Err(e) = self.quicklist.compress(Some(current)) {
                return Some(Err(e));
            }
            self.current = if forward {
                node_ref(current).next
            } else {
                node_ref(current).prev
            };
            self.offset = if forward { 0 } else { -1 };
        }
    }
}

impl Drop for QuickListIter<'_> {
    fn drop(&mut self) {
        self.release_current();
    }
}
