//! Host adapter trait interfaces for sitewarden
//!
//! This crate defines the interface between the core and the browser it
//! serves: tab operations and named timers. It contains no transport code
//! itself; see `sitewarden-host-native` for the native-messaging adapter.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
