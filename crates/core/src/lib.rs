//! Core types and utilities for the meme token aggregator
//!
//! This crate provides shared types used across all components:
//! - Canonical token records and source tags
//! - Change and feed events
//! - Service configuration
//! - Error taxonomy

pub mod types;
pub mod tokens;
pub mod config;
pub mod errors;

pub use types::*;
pub use tokens::*;
pub use config::*;
pub use errors::*;
