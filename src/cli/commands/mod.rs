//! CLI command handlers

pub mod config;
pub mod credentials;
pub mod generate;
pub mod models;
