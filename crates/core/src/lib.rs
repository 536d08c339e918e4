//! Core types and utilities for the rates monitor
//!
//! This crate provides shared types used across all components:
//! - Readings and aggregate results
//! - Feed and monitor configuration records
//! - Numeric extraction of scraped rate text
//! - Error taxonomy

pub mod types;
pub mod numeric;
pub mod config;
pub mod errors;

pub use types::*;
pub use numeric::*;
pub use config::*;
pub use errors::*;
