//! Protocol and storage types for sitewarden
//!
//! This crate defines the stable shapes exchanged with the browser side:
//! - Storage values (block-list, settings, whitelist)
//! - Inbound browser messages (tab updates, runtime messages, alarms, storage changes)
//! - Outbound host commands (redirect, close, open tab)
//! - Timer names
//!
//! Field names follow the extension's camelCase JSON.

mod commands;
mod events;
mod timers;
mod types;

pub use commands::*;
pub use events::*;
pub use timers::*;
pub use types::*;

/// Current protocol version
pub const API_VERSION: u32 = 1;
