pub mod config;
pub mod entry;
pub mod paths;
pub mod store;
