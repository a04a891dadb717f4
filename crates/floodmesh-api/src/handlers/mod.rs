//! HTTP API handlers: exposes node state as JSON.

pub mod messages;
pub mod network;
pub mod status;

use axum::http::StatusCode;
use tokio::sync::{broadcast, oneshot, watch};

use floodmesh_core::PeerMeta;
use floodmesh_services::{ControlCommand, ControlSender, MessageStore};

#[derive(Clone)]
pub struct ApiState {
    /// Commands for the running node.
    pub control_tx: ControlSender,
    pub inbox: MessageStore,
    /// Local GID and connection count, updated on every membership change.
    pub local_meta: watch::Receiver<PeerMeta>,
    /// Signals graceful daemon shutdown.
    pub shutdown_tx: broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

pub type ApiError = (StatusCode, String);

/// Send a command to the node and wait for its answer.
async fn request<T>(
    state: &ApiState,
    build: impl FnOnce(oneshot::Sender<T>) -> ControlCommand,
) -> Result<T, ApiError> {
    let (reply, rx) = oneshot::channel();
    state.control_tx.send(build(reply)).await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "node is not running".to_string(),
        )
    })?;
    rx.await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "node dropped the request".to_string(),
        )
    })
}

// Re-export handler functions for use in router setup.
pub use messages::{handle_get_messages, handle_send_message};
pub use network::handle_enter_network;
pub use status::{handle_peers, handle_shutdown, handle_status};
