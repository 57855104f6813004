use crate::data_structure::quicklist::error::{QuickListError, Result};

/// An LZF compressed listpack. The uncompressed length lives in the owning
/// node's `sz`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickListLzf {
    /// LZF size in bytes
    pub sz: usize,
    pub compressed: Vec<u8>,
}

impl QuickListLzf {
    pub fn new(compressed: Vec<u8>) -> Self {
        Self {
            sz: compressed.len(),
            compressed,
        }
    }

    /// Returns `None` when LZF could not shrink `data` at all.
    pub fn compress(data: &[u8]) -> Option<Self> {
        match lzf::compress(data) {
            Ok(compressed) if !compressed.is_empty() => Some(Self::new(compressed)),
            _ => None,
        }
    }

    pub fn decompress(&self, sz: usize) -> Result<Vec<u8>> {
        let data = lzf::decompress(&self.compressed, sz)
            .map_err(|e| QuickListError::CorruptCompressedData(format!("{e:?}")))?;
        if data.len() != sz {
            return Err(QuickListError::CorruptCompressedData(format!(
                "expect {sz} bytes, got {}",
                data.len()
            )));
        }
        Ok(data)
    }
}

/// Source of payload buffers for node copies; failing here aborts the copy.
pub trait NodeAllocator {
    fn alloc(&mut self, len: usize) -> Result<Vec<u8>>;
}

/// Allocates through `Vec::try_reserve_exact`, reporting exhaustion instead
/// of aborting.
#[derive(Clone, Copy, Debug, Default)]
pub struct TryAllocator;

impl NodeAllocator for TryAllocator {
    fn alloc(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| QuickListError::AllocationFailure(len))?;
        Ok(buf)
    }
}

impl<F> NodeAllocator for F
where
    F: FnMut(usize) -> Result<Vec<u8>>,
{
    fn alloc(&mut self, len: usize) -> Result<Vec<u8>> {
        self(len)
    }
}
