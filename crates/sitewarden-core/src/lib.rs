//! Core blocking engine for sitewardend
//!
//! This crate is the heart of sitewardend, containing:
//! - Rule store (block-list and time-window settings mirrored from storage)
//! - Snooze whitelist keyed by (domain, tab) with lazy expiry
//! - Blocking decisions for a URL in a tab at a point in time
//! - Timer naming and fired-timer routing (`whitelistCleanup`, `closeTab-<id>`)
//! - The event -> effects engine, its executor, and the single-writer persist queue

mod decision;
mod engine;
mod events;
mod executor;
mod persist;
mod rules;
mod scheduler;
mod whitelist;

pub use decision::*;
pub use engine::*;
pub use events::*;
pub use executor::*;
pub use persist::*;
pub use rules::*;
pub use scheduler::*;
pub use whitelist::*;
