use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use tracing::trace;

use crate::data_structure::listpack::listpack::ListPack;
use crate::data_structure::listpack::LpValue;
use crate::data_structure::quicklist::error::{QuickListError, Result};
use crate::data_structure::quicklist::iter::ListValue;
use crate::data_structure::quicklist::lib::{NodeAllocator, QuickListLzf};
use crate::data_structure::quicklist::{
    quicklist_node_exceed_limit, LP_MERGE_OVERHEAD, MIN_COMPRESS_BYTES, MIN_COMPRESS_IMPROVE,
    QUICKLIST_NODE_CONTAINER_PACKED, QUICKLIST_NODE_CONTAINER_PLAIN,
    QUICKLIST_NODE_ENCODING_LZF, QUICKLIST_NODE_ENCODING_RAW, SIZE_ESTIMATE_OVERHEAD,
};

pub(crate) enum NodeEntry {
    Packed(ListPack),
    Plain(Vec<u8>),
    Lzf(QuickListLzf),
}

pub struct QuickListNode {
    pub(crate) prev: Option<NonNull<QuickListNode>>,
    pub(crate) next: Option<NonNull<QuickListNode>>,
    pub(crate) entry: NodeEntry,
    /// uncompressed entry size in bytes
    sz: usize,
    /// count of items in listpack
    pub(crate) count: u32,
    /// was this node previous compressed?
    recompress: bool,
    /// node can't compress; too small or incompressible
    attempted_compress: bool,
}

#[inline]
pub(crate) fn node_ref<'a>(node: NonNull<QuickListNode>) -> &'a QuickListNode {
    unsafe { &*node.as_ptr() }
}

#[inline]
pub(crate) fn node_mut<'a>(node: NonNull<QuickListNode>) -> &'a mut QuickListNode {
    unsafe { &mut *node.as_ptr() }
}

pub(crate) fn alloc_node(node: QuickListNode) -> NonNull<QuickListNode> {
    unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(node))) }
}

pub(crate) fn free_node(node: NonNull<QuickListNode>) -> Box<QuickListNode> {
    unsafe { Box::from_raw(node.as_ptr()) }
}

impl QuickListNode {
    pub(crate) fn new_packed(lp: ListPack) -> Self {
        Self {
            prev: None,
            next: None,
            sz: lp.bytes(),
            count: lp.length() as u32,
            entry: NodeEntry::Packed(lp),
            recompress: false,
            attempted_compress: false,
        }
    }

    pub(crate) fn new_plain(value: &[u8]) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(value.len())
            .map_err(|_| QuickListError::AllocationFailure(value.len()))?;
        buf.extend_from_slice(value);
        Ok(Self {
            prev: None,
            next: None,
            sz: buf.len(),
            count: 1,
            entry: NodeEntry::Plain(buf),
            recompress: false,
            attempted_compress: false,
        })
    }

    pub(crate) fn with_value(value: &[u8]) -> Result<Self> {
        let mut lp = ListPack::new();
        lp.append(value)?;
        Ok(Self::new_packed(lp))
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Uncompressed size of the payload in bytes.
    pub fn sz(&self) -> usize {
        self.sz
    }

    /// RAW==1 or LZF==2
    pub fn encoding(&self) -> u32 {
        match self.entry {
            NodeEntry::Lzf(_) => QUICKLIST_NODE_ENCODING_LZF,
            _ => QUICKLIST_NODE_ENCODING_RAW,
        }
    }

    /// PLAIN==1 or PACKED==2
    pub fn container(&self) -> u32 {
        match self.entry {
            NodeEntry::Plain(_) => QUICKLIST_NODE_CONTAINER_PLAIN,
            _ => QUICKLIST_NODE_CONTAINER_PACKED,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.entry, NodeEntry::Lzf(_))
    }

    pub fn is_plain(&self) -> bool {
        matches!(self.entry, NodeEntry::Plain(_))
    }

    pub fn recompress(&self) -> bool {
        self.recompress
    }

    pub fn attempted_compress(&self) -> bool {
        self.attempted_compress
    }

    /// The compressed blob, if the node is currently compressed.
    pub fn get_lzf(&self) -> Option<&QuickListLzf> {
        match &self.entry {
            NodeEntry::Lzf(lzf) => Some(lzf),
            _ => None,
        }
    }

    /// Compresses a raw listpack in place. Returns false and leaves the node
    /// raw when compression is skipped or would not save enough.
    pub(crate) fn compress(&mut self) -> bool {
        if self.attempted_compress {
            return false;
        }
        let NodeEntry::Packed(lp) = &self.entry else {
            return false;
        };
        self.recompress = false;
        if self.sz < MIN_COMPRESS_BYTES {
            self.attempted_compress = true;
            return false;
        }

        match QuickListLzf::compress(lp.as_bytes()) {
            Some(lzf) if lzf.sz + MIN_COMPRESS_IMPROVE < self.sz => {
                trace!("compress node of {} bytes into {} bytes", self.sz, lzf.sz);
                self.entry = NodeEntry::Lzf(lzf);
                true
            }
            _ => {
                self.attempted_compress = true;
                false
            }
        }
    }

    /// Restores the raw listpack from the compressed blob.
    pub(crate) fn decompress(&mut self) -> Result<()> {
        self.recompress = false;
        let NodeEntry::Lzf(lzf) = &self.entry else {
            return Ok(());
        };
        let data = lzf.decompress(self.sz)?;
        let lp = ListPack::from_vec(data)
            .map_err(|e| QuickListError::CorruptCompressedData(e.to_string()))?;
        if lp.length() != self.count as usize {
            return Err(QuickListError::CorruptCompressedData(format!(
                "expect {} entries, got {}",
                self.count,
                lp.length()
            )));
        }
        self.entry = NodeEntry::Packed(lp);
        Ok(())
    }

    /// Decompresses for a transient access and remembers to fold the node
    /// back afterwards.
    pub(crate) fn decompress_for_use(&mut self) -> Result<()> {
        if self.is_compressed() {
            self.decompress()?;
            self.recompress = true;
        }
        Ok(())
    }

    pub(crate) fn recompress_only(&mut self) {
        if self.recompress {
            self.compress();
        }
    }

    pub(crate) fn listpack(&self) -> Result<&ListPack> {
        match &self.entry {
            NodeEntry::Packed(lp) => Ok(lp),
            _ => Err(QuickListError::NodeNotPacked),
        }
    }

    /// Raw listpack for mutation; a compressed node is decompressed for use
    /// first.
    pub(crate) fn listpack_mut(&mut self) -> Result<&mut ListPack> {
        self.decompress_for_use()?;
        match &mut self.entry {
            NodeEntry::Packed(lp) => Ok(lp),
            _ => Err(QuickListError::NodeNotPacked),
        }
    }

    pub(crate) fn set_plain(&mut self, value: &[u8]) -> Result<()> {
        let NodeEntry::Plain(buf) = &mut self.entry else {
            return Err(QuickListError::NodeNotPacked);
        };
        buf.clear();
        buf.try_reserve_exact(value.len())
            .map_err(|_| QuickListError::AllocationFailure(value.len()))?;
        buf.extend_from_slice(value);
        self.sz = value.len();
        Ok(())
    }

    /// Refreshes size and count after the listpack changed. Changed content
    /// deserves a fresh compression attempt.
    pub(crate) fn update_sz(&mut self) {
        if let NodeEntry::Packed(lp) = &self.entry {
            self.sz = lp.bytes();
            self.count = lp.length() as u32;
        }
        self.attempted_compress = false;
    }

    pub(crate) fn allow_insert(&self, fill: i32, sz: usize) -> bool {
        if self.is_plain() {
            return false;
        }
        let new_sz = self.sz + sz + SIZE_ESTIMATE_OVERHEAD;
        !quicklist_node_exceed_limit(fill, new_sz, self.count + 1)
    }

    pub(crate) fn allow_merge(a: &QuickListNode, b: &QuickListNode, fill: i32) -> bool {
        if a.is_plain() || b.is_plain() {
            return false;
        }
        let merge_sz = a.sz + b.sz - LP_MERGE_OVERHEAD;
        !quicklist_node_exceed_limit(fill, merge_sz, a.count + b.count)
    }

    /// Position of the element at `index` in a raw node.
    pub(crate) fn seek(&self, index: i64) -> Option<usize> {
        match &self.entry {
            NodeEntry::Packed(lp) => lp.seek(index),
            NodeEntry::Plain(_) => (index == 0 || index == -1).then_some(0),
            NodeEntry::Lzf(_) => None,
        }
    }

    pub(crate) fn step(&self, pos: usize, forward: bool) -> Option<usize> {
        match &self.entry {
            NodeEntry::Packed(lp) if forward => lp.next(pos),
            NodeEntry::Packed(lp) => lp.prev(pos),
            _ => None,
        }
    }

    pub(crate) fn raw_at_pos(&self, pos: usize) -> Option<LpValue<'_>> {
        match &self.entry {
            NodeEntry::Packed(lp) => lp.get(pos),
            NodeEntry::Plain(buf) => (pos == 0).then_some(LpValue::Str(buf)),
            NodeEntry::Lzf(_) => None,
        }
    }

    pub(crate) fn value_at_pos(&self, pos: usize) -> Option<ListValue> {
        self.raw_at_pos(pos).map(ListValue::from)
    }

    pub(crate) fn value_at(&self, offset: usize) -> Option<ListValue> {
        self.seek(offset as i64).and_then(|pos| self.value_at_pos(pos))
    }

    /// Deep copy of the payload, compressed blobs included as they are.
    pub(crate) fn duplicate<A: NodeAllocator + ?Sized>(&self, alloc: &mut A) -> Result<Self> {
        let entry = match &self.entry {
            NodeEntry::Packed(lp) => {
                let mut buf = alloc.alloc(lp.bytes())?;
                buf.extend_from_slice(lp.as_bytes());
                NodeEntry::Packed(ListPack::from_vec_unchecked(buf)?)
            }
            NodeEntry::Plain(value) => {
                let mut buf = alloc.alloc(value.len())?;
                buf.extend_from_slice(value);
                NodeEntry::Plain(buf)
            }
            NodeEntry::Lzf(lzf) => {
                let mut buf = alloc.alloc(lzf.sz)?;
                buf.extend_from_slice(&lzf.compressed);
                NodeEntry::Lzf(QuickListLzf::new(buf))
            }
        };
        Ok(Self {
            prev: None,
            next: None,
            entry,
            sz: self.sz,
            count: self.count,
            recompress: false,
            attempted_compress: self.attempted_compress,
        })
    }
}

impl fmt::Debug for QuickListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickListNode")
            .field("sz", &self.sz)
            .field("count", &self.count)
            .field("encoding", &self.encoding())
            .field("container", &self.container())
            .field("recompress", &self.recompress)
            .field("attempted_compress", &self.attempted_compress)
            .finish()
    }
}

/// Keeps a node decompressed while it is read and folds it back when the
/// guard goes out of scope.
pub(crate) struct NodeGuard<'a> {
    node: &'a mut QuickListNode,
}

impl<'a> NodeGuard<'a> {
    pub(crate) fn acquire(node: &'a mut QuickListNode) -> Result<Self> {
        node.decompress_for_use()?;
        Ok(Self { node })
    }
}

impl Deref for NodeGuard<'_> {
    type Target = QuickListNode;

    fn deref(&self) -> &Self::Target {
        self.node
    }
}

impl DerefMut for NodeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.node
    }
}

impl Drop for NodeGuard<'_> {
    fn drop(&mut self) {
        self.node.recompress_only();
    }
}
