//! /network/enter handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use floodmesh_services::ControlCommand;

use super::{request, ApiError, ApiState};

#[derive(Debug, Deserialize)]
pub struct EnterNetworkRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct EnterNetworkResponse {
    pub address: String,
    pub message: String,
}

pub async fn handle_enter_network(
    State(state): State<ApiState>,
    Json(req): Json<EnterNetworkRequest>,
) -> Result<Json<EnterNetworkResponse>, ApiError> {
    let address = req.address.trim().to_string();
    if address.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "address must not be empty".to_string()));
    }

    let target = address.clone();
    request(&state, |reply| ControlCommand::EnterNetwork {
        address: target,
        reply,
    })
    .await?
    .map_err(|e| (StatusCode::BAD_GATEWAY, e))?;

    Ok(Json(EnterNetworkResponse {
        address,
        message: "join request sent".to_string(),
    }))
}
