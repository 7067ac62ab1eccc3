pub mod aliases;
pub mod context;
pub mod models;
pub mod persist;
pub mod repository;
pub mod store;
pub mod types;
