//! Shared utilities for sitewarden
//!
//! This crate provides:
//! - ID types (TabId)
//! - Time utilities (mockable wall clock, daily blocking windows)
//! - Domain normalization and suffix matching
//! - Error types
//! - Retry/backoff policy for persistence writes
//! - Default paths for config and data directories

mod domain;
mod error;
mod ids;
mod paths;
mod retry;
mod time;

pub use domain::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use retry::*;
pub use time::*;
