use floodmesh_services::{FrameError, StoreError};

/// Errors returned by the node's public operations and dialing helpers.
///
/// None of these are fatal to the process. Callers on protocol paths log
/// them and abort the single action that failed.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("refusing to connect to own address {0}")]
    SelfConnect(String),

    #[error("already connected to {0}")]
    AlreadyConnected(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to dial {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
