#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ListPackError {
    #[error("[ListPack]Allocate {0} bytes fail")]
    AllocFailed(usize),
    #[error("[ListPack]Position out of range({0})")]
    OutOfRange(usize),
    #[error("[ListPack]Corrupted: {0}")]
    Corrupted(String),
}
