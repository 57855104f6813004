pub mod listpack;
pub mod quicklist;
