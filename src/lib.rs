// Public API - data types, pipeline stages, and export functions
pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod render;
pub mod route;
pub mod trace;

// Internal implementation - not part of public API
pub(crate) mod cli;

pub use cli::{Args, ExportFormat};
