//! Rule-list sources.

pub mod file;

pub use file::FileProvider;
