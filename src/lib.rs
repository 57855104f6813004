pub mod config;
pub mod data_structure;

pub use data_structure::listpack::listpack::ListPack;
pub use data_structure::quicklist::iter::{Direction, ListValue, QuickListEntry};
pub use data_structure::quicklist::quicklist::{QuickList, Where};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
