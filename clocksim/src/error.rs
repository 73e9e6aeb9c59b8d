//! Error types for the clocksim crate

use std::path::PathBuf;

use thiserror::Error;

use crate::Port;

pub type Result<T> = std::result::Result<T, SimulationError>;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Cannot bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open event log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Event log write failed: {0}")]
    LogWrite(#[source] std::io::Error),

    #[error("Inbox of machine {0} is poisoned")]
    PoisonedInbox(Port),

    #[error("Peer closed the connection before the handshake completed")]
    HandshakeClosed,

    #[error("Peer {0} sent nothing within the receive timeout")]
    ReceiveTimeout(std::net::SocketAddr),

    #[error("Connection closed without a payload")]
    EmptyPayload,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
