//! rf-core: Shared types for the ReelForge runtime
//!
//! This crate provides the foundational types used across the runtime crates:
//! the common error type, time sources and runtime configuration.

mod config;
mod error;
mod time;

pub use config::*;
pub use error::*;
pub use time::*;
