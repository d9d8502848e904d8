pub mod base;
pub mod mock;
