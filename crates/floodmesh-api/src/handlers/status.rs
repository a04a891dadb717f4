//! /status, /peers, /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use floodmesh_services::{ControlCommand, PeerSummary};

use super::{request, ApiError, ApiState};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub gid: String,
    pub connection_count: u32,
    pub peers: Vec<PeerSummary>,
    pub messages_received: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiError> {
    let meta = state.local_meta.borrow().clone();
    let peers = request(&state, |reply| ControlCommand::Peers { reply }).await?;

    Ok(Json(StatusResponse {
        gid: meta.gid,
        connection_count: meta.connection_count,
        peers,
        messages_received: state.inbox.total(),
    }))
}

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PeersResponse {
    pub peers: Vec<PeerSummary>,
}

pub async fn handle_peers(State(state): State<ApiState>) -> Result<Json<PeersResponse>, ApiError> {
    let peers = request(&state, |reply| ControlCommand::Peers { reply }).await?;
    Ok(Json(PeersResponse { peers }))
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
