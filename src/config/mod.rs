//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/modelbridge/config.toml)
//! 3. Project config (.modelbridge/config.toml)
//! 4. Environment variables (MODELBRIDGE_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
