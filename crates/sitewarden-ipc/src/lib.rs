//! IPC layer for sitewarden
//!
//! Provides:
//! - Native-messaging framing (32-bit native-endian length prefix + UTF-8 JSON)
//! - A duplex server over the host's stdin/stdout
//! - Inbound message routing to the service loop

mod codec;
mod server;

pub use codec::*;
pub use server::*;

use thiserror::Error;

/// IPC errors
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },
}

pub type IpcResult<T> = Result<T, IpcError>;
