pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod locks;
pub mod transaction;
pub mod catalog;
pub mod stats;
