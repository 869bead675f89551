//! # Common Components
//!
//! Shared utilities used by the server binary and the API layer.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration parsing for the HTTP service

pub mod config;
