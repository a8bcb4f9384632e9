pub mod catalog;
pub mod index_format;
pub mod version;
