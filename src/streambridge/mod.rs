pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod schema;
pub mod serialization;
pub mod testing;
