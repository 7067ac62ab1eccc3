pub mod allocator;
pub mod config;
pub mod core;
pub mod errors;
pub mod extensions;
pub mod logging;
