use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::config::QuickListConfig;
use crate::data_structure::listpack::listpack::{ListPack, LpWhere};
use crate::data_structure::listpack::LpValue;
use crate::data_structure::quicklist::error::{QuickListError, Result};
use crate::data_structure::quicklist::iter::{ListValue, QuickListEntry};
use crate::data_structure::quicklist::lib::{NodeAllocator, TryAllocator};
use crate::data_structure::quicklist::node::{
    alloc_node, free_node, node_mut, node_ref, NodeGuard, QuickListNode,
};
use crate::data_structure::quicklist::{
    is_large_element, quicklist_node_exceed_limit, COMPRESS_MAX, DEFAULT_PACKED_THRESHOLD,
    FILL_MAX, MAX_PACKED_THRESHOLD, SIZE_ESTIMATE_OVERHEAD,
};

/// Which end of the list a push or pop works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Where {
    Head,
    Tail,
}

/// Element removed by `pop_custom`: strings go through the caller's saver,
/// integers come back as they were stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Popped<T> {
    Data(T),
    Int(i64),
}

pub struct QuickList {
    pub(crate) head: Option<NonNull<QuickListNode>>,
    pub(crate) tail: Option<NonNull<QuickListNode>>,
    /// total count of all entries in all listpacks
    count: u64,
    /// number of quicklistNodes
    len: u64,
    /// fill factor for individual nodes
    fill: i32,
    /// depth of end nodes not to compress;0=off
    compress: u32,
    /// elements of at least this many bytes get a plain node
    packed_threshold: usize,
    _marker: PhantomData<Box<QuickListNode>>,
}

impl Default for QuickList {
    fn default() -> Self {
        Self::create()
    }
}

/// Walks the nodes from head to tail.
pub struct NodeIter<'a> {
    current: Option<NonNull<QuickListNode>>,
    _marker: PhantomData<&'a QuickListNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a QuickListNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = node_ref(self.current?);
        self.current = node.next;
        Some(node)
    }
}

impl QuickList {
    pub fn create() -> Self {
        Self {
            head: None,
            tail: None,
            count: 0,
            len: 0,
            fill: -2,
            compress: 0,
            packed_threshold: DEFAULT_PACKED_THRESHOLD,
            _marker: PhantomData,
        }
    }

    pub fn new(fill: i32, compress: i32) -> Self {
        let mut quicklist = Self::create();
        quicklist.fill = Self::clamp_fill(fill);
        quicklist.compress = Self::clamp_depth(compress);
        quicklist
    }

    pub fn from_config(config: &QuickListConfig) -> Self {
        let mut quicklist = Self::new(config.list_max_listpack_size, config.list_compress_depth);
        if !quicklist.set_packed_threshold(config.packed_threshold) {
            warn!(
                "packed threshold {} is too large, keep {}",
                config.packed_threshold, quicklist.packed_threshold
            );
        }
        quicklist
    }

    /// Builds a list around an existing listpack.
    pub fn create_from_listpack(fill: i32, compress: i32, lp: ListPack) -> Result<Self> {
        let mut quicklist = Self::new(fill, compress);
        quicklist.append_listpack(lp)?;
        Ok(quicklist)
    }

    fn clamp_fill(fill: i32) -> i32 {
        fill.clamp(-5, FILL_MAX)
    }

    fn clamp_depth(compress: i32) -> u32 {
        if compress < 0 {
            0
        } else {
            (compress as u32).min(COMPRESS_MAX)
        }
    }

    pub fn set_fill(&mut self, fill: i32) {
        self.fill = Self::clamp_fill(fill);
    }

    /// Changes the protected window and re-applies compression to every node.
    pub fn set_compress_depth(&mut self, compress: i32) -> Result<()> {
        self.compress = Self::clamp_depth(compress);
        self.compress_all()
    }

    pub fn set_options(&mut self, fill: i32, compress: i32) -> Result<()> {
        self.set_fill(fill);
        self.set_compress_depth(compress)
    }

    /// Returns false if `sz` is beyond what a plain node may hold; 0 restores
    /// the default.
    pub fn set_packed_threshold(&mut self, sz: usize) -> bool {
        if sz > MAX_PACKED_THRESHOLD {
            return false;
        }
        self.packed_threshold = if sz == 0 { DEFAULT_PACKED_THRESHOLD } else { sz };
        true
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of nodes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn fill(&self) -> i32 {
        self.fill
    }

    pub fn compress_depth(&self) -> u32 {
        self.compress
    }

    pub fn packed_threshold(&self) -> usize {
        self.packed_threshold
    }

    pub fn nodes(&self) -> NodeIter<'_> {
        NodeIter {
            current: self.head,
            _marker: PhantomData,
        }
    }

    fn is_large(&self, sz: usize) -> bool {
        is_large_element(sz, self.fill, self.packed_threshold)
    }

    fn in_window(&self, idx: u64) -> bool {
        let depth = self.compress as u64;
        depth == 0 || idx < depth || idx + depth >= self.len
    }

    fn apply_window(&mut self, node: NonNull<QuickListNode>, idx: u64) -> Result<()> {
        if self.in_window(idx) {
            node_mut(node).decompress()
        } else {
            node_mut(node).compress();
            Ok(())
        }
    }

    fn compress_all(&mut self) -> Result<()> {
        let mut current = self.head;
        let mut idx = 0;
        while let Some(node) = current {
            self.apply_window(node, idx)?;
            current = node_ref(node).next;
            idx += 1;
        }
        Ok(())
    }

    /// Keeps the `compress` nodes at each end raw and compresses the first
    /// node past either window, plus `node` when it lies outside both.
    pub(crate) fn compress(&mut self, node: Option<NonNull<QuickListNode>>) -> Result<()> {
        if self.len == 0 || self.compress == 0 {
            return Ok(());
        }

        if self.len <= self.compress as u64 * 2 {
            // every node is inside the window
            let mut current = self.head;
            while let Some(n) = current {
                node_mut(n).decompress()?;
                current = node_ref(n).next;
            }
            return Ok(());
        }

        let mut forward = self.head;
        let mut reverse = self.tail;
        let mut in_depth = false;
        for _ in 0..self.compress {
            let (Some(f), Some(r)) = (forward, reverse) else {
                return Ok(());
            };
            node_mut(f).decompress()?;
            node_mut(r).decompress()?;
            if node == Some(f) || node == Some(r) {
                in_depth = true;
            }
            forward = node_ref(f).next;
            reverse = node_ref(r).prev;
        }

        if !in_depth {
            if let Some(n) = node {
                node_mut(n).compress();
            }
        }
        if let Some(f) = forward {
            node_mut(f).compress();
        }
        if let Some(r) = reverse {
            node_mut(r).compress();
        }
        Ok(())
    }

    fn insert_node(
        &mut self,
        old_node: Option<NonNull<QuickListNode>>,
        new_node: NonNull<QuickListNode>,
        after: bool,
    ) -> Result<()> {
        let new = node_mut(new_node);
        if after {
            new.prev = old_node;
            if let Some(old) = old_node {
                new.next = node_ref(old).next;
                if let Some(next) = node_ref(old).next {
                    node_mut(next).prev = Some(new_node);
                }
                node_mut(old).next = Some(new_node);
            }
            if self.tail == old_node {
                self.tail = Some(new_node);
            }
        } else {
            new.next = old_node;
            if let Some(old) = old_node {
                new.prev = node_ref(old).prev;
                if let Some(prev) = node_ref(old).prev {
                    node_mut(prev).next = Some(new_node);
                }
                node_mut(old).prev = Some(new_node);
            }
            if self.head == old_node {
                self.head = Some(new_node);
            }
        }
        if self.len == 0 {
            self.head = Some(new_node);
            self.tail = Some(new_node);
        }
        self.len += 1;

        if let Some(old) = old_node {
            self.compress(Some(old))?;
        }
        self.compress(Some(new_node))
    }

    /// Appends a node with no compression pass; used to build copies.
    fn link_tail(&mut self, new_node: NonNull<QuickListNode>) {
        let new = node_mut(new_node);
        new.prev = self.tail;
        new.next = None;
        match self.tail {
            Some(tail) => node_mut(tail).next = Some(new_node),
            None => self.head = Some(new_node),
        }
        self.tail = Some(new_node);
        self.len += 1;
        self.count += new.count as u64;
    }

    fn del_node(&mut self, node: NonNull<QuickListNode>) -> Result<()> {
        let removed = free_node(node);
        if let Some(next) = removed.next {
            node_mut(next).prev = removed.prev;
        }
        if let Some(prev) = removed.prev {
            node_mut(prev).next = removed.next;
        }
        if self.tail == Some(node) {
            self.tail = removed.prev;
        }
        if self.head == Some(node) {
            self.head = removed.next;
        }
        self.len -= 1;
        self.count -= removed.count as u64;
        drop(removed);

        self.compress(None)
    }

    /// Removes the element at `offset` of `node`. Returns true when the node
    /// itself went away.
    pub(crate) fn del_index(&mut self, node: NonNull<QuickListNode>, offset: usize) -> Result<bool> {
        let n = node_mut(node);
        if n.is_plain() {
            self.del_node(node)?;
            return Ok(true);
        }
        let lp = n.listpack_mut()?;
        let pos = lp.seek(offset as i64).ok_or(QuickListError::StaleEntry)?;
        lp.delete(pos)?;
        n.update_sz();
        self.count -= 1;
        if n.count == 0 {
            self.del_node(node)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn insert_plain_node(
        &mut self,
        old_node: Option<NonNull<QuickListNode>>,
        value: &[u8],
        after: bool,
    ) -> Result<()> {
        debug!("insert plain node of {} bytes", value.len());
        let node = alloc_node(QuickListNode::new_plain(value)?);
        self.count += 1;
        self.insert_node(old_node, node, after)
    }

    /// Adds `value` at the head. Returns true if a new head node was created.
    pub fn push_head(&mut self, value: &[u8]) -> Result<bool> {
        let orig_head = self.head;
        if self.is_large(value.len()) {
            self.insert_plain_node(self.head, value, false)?;
            return Ok(true);
        }

        match self.head {
            Some(head) if node_ref(head).allow_insert(self.fill, value.len()) => {
                let node = node_mut(head);
                node.listpack_mut()?.prepend(value)?;
                node.update_sz();
                self.count += 1;
                self.compress(Some(head))?;
            }
            _ => {
                let node = alloc_node(QuickListNode::with_value(value)?);
                self.count += 1;
                self.insert_node(self.head, node, false)?;
            }
        }
        Ok(orig_head != self.head)
    }

    /// Adds `value` at the tail. Returns true if a new tail node was created.
    pub fn push_tail(&mut self, value: &[u8]) -> Result<bool> {
        let orig_tail = self.tail;
        if self.is_large(value.len()) {
            self.insert_plain_node(self.tail, value, true)?;
            return Ok(true);
        }

        match self.tail {
            Some(tail) if node_ref(tail).allow_insert(self.fill, value.len()) => {
                let node = node_mut(tail);
                node.listpack_mut()?.append(value)?;
                node.update_sz();
                self.count += 1;
                self.compress(Some(tail))?;
            }
            _ => {
                let node = alloc_node(QuickListNode::with_value(value)?);
                self.count += 1;
                self.insert_node(self.tail, node, true)?;
            }
        }
        Ok(orig_tail != self.tail)
    }

    pub fn push(&mut self, value: &[u8], where_: Where) -> Result<()> {
        match where_ {
            Where::Head => self.push_head(value)?,
            Where::Tail => self.push_tail(value)?,
        };
        Ok(())
    }

    /// Adopts `lp` as a new tail node. A listpack over the node budget is
    /// pushed value by value instead; an empty one is ignored.
    pub fn append_listpack(&mut self, lp: ListPack) -> Result<()> {
        if lp.is_empty() {
            return Ok(());
        }
        if quicklist_node_exceed_limit(self.fill, lp.bytes(), lp.length() as u32) {
            return self.append_values_from_listpack(&lp);
        }
        let node = alloc_node(QuickListNode::new_packed(lp));
        self.count += node_ref(node).count as u64;
        self.insert_node(self.tail, node, true)
    }

    pub fn append_values_from_listpack(&mut self, lp: &ListPack) -> Result<()> {
        for value in lp {
            match value {
                LpValue::Str(s) => self.push_tail(s)?,
                LpValue::Int(v) => self.push_tail(v.to_string().as_bytes())?,
            };
        }
        Ok(())
    }

    /// Walks from whichever end is closer and returns the node holding
    /// `index` with the offset inside it. Negative indexes count from the tail.
    pub(crate) fn locate(&self, index: i64) -> Option<(NonNull<QuickListNode>, usize)> {
        let count = self.count as i64;
        let index = if index < 0 { count + index } else { index };
        if index < 0 || index >= count {
            return None;
        }
        let index = index as u64;

        let mut accum = 0u64;
        if index <= (self.count - 1) / 2 {
            let mut current = self.head;
            while let Some(node) = current {
                let c = node_ref(node).count as u64;
                if accum + c > index {
                    return Some((node, (index - accum) as usize));
                }
                accum += c;
                current = node_ref(node).next;
            }
        } else {
            let rindex = self.count - 1 - index;
            let mut current = self.tail;
            while let Some(node) = current {
                let c = node_ref(node).count as u64;
                if accum + c > rindex {
                    return Some((node, (c - 1 - (rindex - accum)) as usize));
                }
                accum += c;
                current = node_ref(node).prev;
            }
        }
        None
    }

    /// Looks up the element at `index`; negative indexes count from the tail.
    pub fn index(&mut self, index: i64) -> Result<Option<QuickListEntry>> {
        let Some((node, offset)) = self.locate(index) else {
            return Ok(None);
        };
        let guard = NodeGuard::acquire(node_mut(node))?;
        let value = guard
            .value_at(offset)
            .ok_or(QuickListError::NodeNotPacked)?;
        Ok(Some(QuickListEntry {
            node,
            offset,
            value,
        }))
    }

    pub fn get(&mut self, index: i64) -> Result<Option<ListValue>> {
        Ok(self.index(index)?.map(QuickListEntry::into_value))
    }

    fn contains_node(&self, target: NonNull<QuickListNode>) -> bool {
        let mut current = self.head;
        while let Some(node) = current {
            if node == target {
                return true;
            }
            current = node_ref(node).next;
        }
        false
    }

    fn allow_merge(
        &self,
        a: Option<NonNull<QuickListNode>>,
        b: Option<NonNull<QuickListNode>>,
    ) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => QuickListNode::allow_merge(node_ref(a), node_ref(b), self.fill),
            _ => false,
        }
    }

    /// Moves every element of `b` onto the end of `a` and drops `b`; `a`
    /// must directly precede `b`.
    fn listpack_merge(
        &mut self,
        a: NonNull<QuickListNode>,
        b: NonNull<QuickListNode>,
    ) -> Result<NonNull<QuickListNode>> {
        node_mut(a).decompress()?;
        node_mut(b).decompress()?;
        let keep = node_mut(a);
        keep.listpack_mut()?.merge(node_ref(b).listpack()?)?;
        keep.update_sz();
        debug!("merge nodes into {} entries", keep.count);

        node_mut(b).count = 0;
        self.del_node(b)?;
        self.compress(Some(a))?;
        Ok(a)
    }

    /// Tries to merge the two neighbours on each side of `center`, then
    /// `center` with whatever ends up next to it.
    fn merge_nodes(&mut self, center: NonNull<QuickListNode>) -> Result<()> {
        let prev = node_ref(center).prev;
        let prev_prev = prev.and_then(|p| node_ref(p).prev);
        let next = node_ref(center).next;
        let next_next = next.and_then(|n| node_ref(n).next);

        if let (Some(pp), Some(p)) = (prev_prev, prev) {
            if self.allow_merge(Some(pp), Some(p)) {
                self.listpack_merge(pp, p)?;
            }
        }
        if let (Some(n), Some(nn)) = (next, next_next) {
            if self.allow_merge(Some(n), Some(nn)) {
                self.listpack_merge(n, nn)?;
            }
        }

        let target = match node_ref(center).prev {
            Some(p) if self.allow_merge(Some(p), Some(center)) => self.listpack_merge(p, center)?,
            _ => center,
        };
        if let Some(n) = node_ref(target).next {
            if self.allow_merge(Some(target), Some(n)) {
                self.listpack_merge(target, n)?;
            }
        }
        Ok(())
    }

    /// Splits `node` at `offset` and returns the detached half, not yet
    /// linked. With `after` the node keeps `[0, offset]`, otherwise it keeps
    /// `[offset, count)`.
    fn split_node(
        &mut self,
        node: NonNull<QuickListNode>,
        offset: usize,
        after: bool,
    ) -> Result<NonNull<QuickListNode>> {
        let n = node_mut(node);
        let lp = n.listpack_mut()?;
        let count = lp.length();
        let mut buf = TryAllocator.alloc(lp.bytes())?;
        buf.extend_from_slice(lp.as_bytes());
        let mut new_lp = ListPack::from_vec_unchecked(buf)?;

        if after {
            lp.delete_range(offset as i64 + 1, count)?;
            new_lp.delete_range(0, offset + 1)?;
        } else {
            lp.delete_range(0, offset)?;
            new_lp.delete_range(offset as i64, count)?;
        }
        n.update_sz();
        debug!(
            "split node of {} entries at {}: {} + {}",
            count,
            offset,
            n.count,
            new_lp.length()
        );
        Ok(alloc_node(QuickListNode::new_packed(new_lp)))
    }

    fn insert(&mut self, entry: &QuickListEntry, value: &[u8], after: bool) -> Result<()> {
        let node = entry.node;
        if !self.contains_node(node) || entry.offset >= node_ref(node).count as usize {
            return Err(QuickListError::StaleEntry);
        }
        let sz = value.len();
        let fill = self.fill;
        let node_count = node_ref(node).count as usize;
        let full = !node_ref(node).allow_insert(fill, sz);

        let mut at_tail = false;
        let mut at_head = false;
        let mut avail_next = false;
        let mut avail_prev = false;
        if after && entry.offset == node_count - 1 {
            at_tail = true;
            avail_next = node_ref(node)
                .next
                .is_some_and(|next| node_ref(next).allow_insert(fill, sz));
        }
        if !after && entry.offset == 0 {
            at_head = true;
            avail_prev = node_ref(node)
                .prev
                .is_some_and(|prev| node_ref(prev).allow_insert(fill, sz));
        }

        if self.is_large(sz) {
            if node_ref(node).is_plain() || at_tail || at_head {
                self.insert_plain_node(Some(node), value, after)?;
            } else {
                let new_node = self.split_node(node, entry.offset, after)?;
                let entry_node = alloc_node(QuickListNode::new_plain(value)?);
                self.insert_node(Some(node), entry_node, after)?;
                self.insert_node(Some(entry_node), new_node, after)?;
                self.count += 1;
            }
            return Ok(());
        }

        if !full {
            let n = node_mut(node);
            let lp = n.listpack_mut()?;
            let pos = lp
                .seek(entry.offset as i64)
                .ok_or(QuickListError::StaleEntry)?;
            let where_ = if after { LpWhere::After } else { LpWhere::Before };
            lp.insert(pos, value, where_)?;
            n.update_sz();
            self.compress(Some(node))?;
        } else if at_tail && avail_next {
            if let Some(next) = node_ref(node).next {
                let n = node_mut(next);
                n.listpack_mut()?.prepend(value)?;
                n.update_sz();
                self.compress(Some(next))?;
            }
        } else if at_head && avail_prev {
            if let Some(prev) = node_ref(node).prev {
                let n = node_mut(prev);
                n.listpack_mut()?.append(value)?;
                n.update_sz();
                self.compress(Some(prev))?;
            }
        } else if at_tail || at_head {
            let new_node = alloc_node(QuickListNode::with_value(value)?);
            self.insert_node(Some(node), new_node, after)?;
        } else {
            // full node, insert lands in the middle
            let new_node = self.split_node(node, entry.offset, after)?;
            if node_ref(new_node).allow_insert(fill, sz) {
                let n = node_mut(new_node);
                let lp = n.listpack_mut()?;
                if after {
                    lp.prepend(value)?;
                } else {
                    lp.append(value)?;
                }
                n.update_sz();
                self.insert_node(Some(node), new_node, after)?;
            } else {
                let value_node = alloc_node(QuickListNode::with_value(value)?);
                self.insert_node(Some(node), value_node, after)?;
                self.insert_node(Some(value_node), new_node, after)?;
            }
            self.merge_nodes(node)?;
        }
        self.count += 1;
        Ok(())
    }

    pub fn insert_before(&mut self, entry: &QuickListEntry, value: &[u8]) -> Result<()> {
        self.insert(entry, value, false)
    }

    pub fn insert_after(&mut self, entry: &QuickListEntry, value: &[u8]) -> Result<()> {
        self.insert(entry, value, true)
    }

    /// Deletes up to `count` elements starting at `start`. Returns false when
    /// nothing was removed.
    pub fn delete_range(&mut self, start: i64, count: i64) -> Result<bool> {
        if count <= 0 {
            return Ok(false);
        }
        let Some((node, mut offset)) = self.locate(start) else {
            return Ok(false);
        };
        let abs = (if start < 0 { self.count as i64 + start } else { start }) as u64;
        let mut extent = (count as u64).min(self.count - abs);

        let mut current = Some(node);
        while extent > 0 {
            let Some(node) = current else {
                break;
            };
            let next = node_ref(node).next;
            let node_count = node_ref(node).count as u64;
            let del = (node_count - offset as u64).min(extent);

            if (offset == 0 && extent >= node_count) || node_ref(node).is_plain() {
                self.del_node(node)?;
            } else {
                let n = node_mut(node);
                n.listpack_mut()?.delete_range(offset as i64, del as usize)?;
                n.update_sz();
                self.count -= del;
                if n.count == 0 {
                    self.del_node(node)?;
                } else {
                    self.compress(Some(node))?;
                }
            }

            extent -= del;
            current = next;
            offset = 0;
        }
        Ok(true)
    }

    /// Overwrites the element at `index`. Returns false when `index` is out
    /// of range.
    pub fn replace_at_index(&mut self, index: i64, value: &[u8]) -> Result<bool> {
        let Some((node, offset)) = self.locate(index) else {
            return Ok(false);
        };
        let sz = value.len();
        let large = self.is_large(sz);
        let n = node_mut(node);

        if !n.is_plain() && !large {
            let current_sz = n.sz();
            let count = n.count;
            let lp = n.listpack_mut()?;
            let pos = lp.seek(offset as i64).ok_or(QuickListError::StaleEntry)?;
            let old_sz = lp.entry_bytes(pos).unwrap_or(0);
            let new_sz = (current_sz + sz + SIZE_ESTIMATE_OVERHEAD).saturating_sub(old_sz);
            if !quicklist_node_exceed_limit(self.fill, new_sz, count) {
                lp.replace(pos, value)?;
                n.update_sz();
                self.compress(Some(node))?;
                return Ok(true);
            }
            n.recompress_only();
        } else if n.is_plain() && large {
            n.set_plain(value)?;
            return Ok(true);
        }

        // the new value needs a different container: delete and insert again
        let abs = if index < 0 { self.count as i64 + index } else { index };
        if !self.del_index(node, offset)? {
            self.compress(Some(node))?;
        }
        if abs as u64 == self.count {
            self.push_tail(value)?;
        } else {
            let entry = self.index(abs)?.ok_or(QuickListError::StaleEntry)?;
            self.insert_before(&entry, value)?;
        }
        Ok(true)
    }

    /// Removes an element from `where_`. String payloads are handed to
    /// `saver`, whose result is returned.
    pub fn pop_custom<T, F>(&mut self, where_: Where, saver: F) -> Result<Option<Popped<T>>>
    where
        F: FnOnce(&[u8]) -> T,
    {
        let end = match where_ {
            Where::Head => self.head,
            Where::Tail => self.tail,
        };
        let Some(node) = end else {
            return Ok(None);
        };

        let (offset, popped) = {
            let guard = NodeGuard::acquire(node_mut(node))?;
            let (index, offset) = match where_ {
                Where::Head => (0, 0),
                Where::Tail => (-1, guard.count as usize - 1),
            };
            let value = guard
                .seek(index)
                .and_then(|pos| guard.raw_at_pos(pos))
                .ok_or(QuickListError::NodeNotPacked)?;
            let popped = match value {
                LpValue::Str(s) => Popped::Data(saver(s)),
                LpValue::Int(v) => Popped::Int(v),
            };
            (offset, popped)
        };

        self.del_index(node, offset)?;
        Ok(Some(popped))
    }

    pub fn pop(&mut self, where_: Where) -> Result<Option<ListValue>> {
        let popped = self.pop_custom(where_, bytes::Bytes::copy_from_slice)?;
        Ok(popped.map(|p| match p {
            Popped::Data(s) => ListValue::Str(s),
            Popped::Int(v) => ListValue::Int(v),
        }))
    }

    /// Moves the tail element to the head.
    pub fn rotate(&mut self) -> Result<()> {
        if self.count <= 1 {
            return Ok(());
        }
        let Some(entry) = self.index(-1)? else {
            return Ok(());
        };
        self.push_head(&entry.value.to_bytes())?;

        // the pushed copy sits at the head, the original is still last
        if let Some(tail) = self.tail {
            let offset = node_ref(tail).count as usize - 1;
            self.del_index(tail, offset)?;
        }
        Ok(())
    }

    pub fn duplicate(&self) -> Result<QuickList> {
        self.duplicate_with(&mut TryAllocator)
    }

    /// Deep copy that takes payload buffers from `alloc`. If any allocation
    /// fails the partial copy is released and `self` is untouched.
    pub fn duplicate_with<A: NodeAllocator + ?Sized>(&self, alloc: &mut A) -> Result<QuickList> {
        let mut copy = QuickList::create();
        copy.fill = self.fill;
        copy.compress = self.compress;
        copy.packed_threshold = self.packed_threshold;

        for node in self.nodes() {
            let dup = node.duplicate(alloc)?;
            copy.link_tail(alloc_node(dup));
        }
        Ok(copy)
    }

    /// Moves every node of `other` onto the end of this list, leaving
    /// `other` empty.
    pub fn join(&mut self, other: &mut QuickList) -> Result<()> {
        let (Some(other_head), Some(other_tail)) = (other.head, other.tail) else {
            return Ok(());
        };
        let old_len = self.len;
        let seam = self.tail;

        match seam {
            Some(tail) => {
                node_mut(tail).next = Some(other_head);
                node_mut(other_head).prev = Some(tail);
            }
            None => self.head = Some(other_head),
        }
        self.tail = Some(other_tail);
        self.len += other.len;
        self.count += other.count;
        let other_depth = other.compress;

        other.head = None;
        other.tail = None;
        other.len = 0;
        other.count = 0;

        if other_depth != self.compress {
            return self.compress_all();
        }
        if old_len == 0 {
            return Ok(());
        }

        // only nodes near the seam can change window membership
        let depth = self.compress as u64;
        let mut current = seam;
        for k in 0..depth.min(old_len) {
            let Some(node) = current else {
                break;
            };
            self.apply_window(node, old_len - 1 - k)?;
            current = node_ref(node).prev;
        }
        let mut current = Some(other_head);
        for k in 0..depth {
            let Some(node) = current else {
                break;
            };
            self.apply_window(node, old_len + k)?;
            current = node_ref(node).next;
        }
        Ok(())
    }
}

impl Drop for QuickList {
    fn drop(&mut self) {
        let mut current = self.head.take();
        while let Some(node) = current {
            current = free_node(node).next;
        }
        self.tail = None;
        self.len = 0;
        self.count = 0;
    }
}

impl fmt::Debug for QuickList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickList")
            .field("count", &self.count)
            .field("len", &self.len)
            .field("fill", &self.fill)
            .field("compress", &self.compress)
            .field("nodes", &self.nodes().collect::<Vec<_>>())
            .finish()
    }
}
