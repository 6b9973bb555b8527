pub mod drive;
pub mod scratch;
