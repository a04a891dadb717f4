//! /messages handlers: messaging endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use floodmesh_services::{ControlCommand, ReceivedMessage, SendReceipt};

use super::{request, ApiError, ApiState};

// ── /messages (GET) ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ReceivedMessage>,
}

pub async fn handle_get_messages(State(state): State<ApiState>) -> Json<MessagesResponse> {
    Json(MessagesResponse {
        messages: state.inbox.all(),
    })
}

// ── /messages/send (POST) ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

pub async fn handle_send_message(
    State(state): State<ApiState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendReceipt>, ApiError> {
    if req.text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text must not be empty".to_string()));
    }

    let payload = Bytes::from(req.text);
    let receipt = request(&state, |reply| ControlCommand::SendMessage { payload, reply })
        .await?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(receipt))
}
