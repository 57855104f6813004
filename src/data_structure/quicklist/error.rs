use crate::data_structure::listpack::error::ListPackError;

pub type Result<T> = std::result::Result<T, QuickListError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuickListError {
    #[error("[QuickList]Allocate {0} bytes fail")]
    AllocationFailure(usize),
    #[error("[QuickList]Compressed node is corrupted: {0}")]
    CorruptCompressedData(String),
    #[error("[QuickList]Entry does not belong to a live node")]
    StaleEntry,
    #[error("[QuickList]Node does not hold a raw listpack")]
    NodeNotPacked,
    #[error("{0}")]
    ListPack(ListPackError),
}

impl From<ListPackError> for QuickListError {
    fn from(err: ListPackError) -> Self {
        match err {
            ListPackError::AllocFailed(sz) => QuickListError::AllocationFailure(sz),
            err => QuickListError::ListPack(err),
        }
    }
}
