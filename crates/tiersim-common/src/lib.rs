//! tiersim Common - Shared types and utilities
//!
//! This crate provides the identifiers, tier definitions, error taxonomy and
//! static configuration used across all tiersim components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
