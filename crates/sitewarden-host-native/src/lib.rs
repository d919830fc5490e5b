//! Native-messaging host adapter for sitewarden
//!
//! Provides:
//! - Tab commands sent to the extension and correlated with its replies
//! - Inbound browser event fan-out
//! - Named periodic and one-shot alarms on the tokio timer

mod alarms;
mod browser;

pub use alarms::*;
pub use browser::*;
