use crate::db::SpaceStore;
use crate::error::{ApiError, ApiResult};
use crate::sync::SyncEngine;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
};
use codespace_core::access::{can_read, is_passcode_correct};
use codespace_core::protocol::{
    CreateSpaceRequest, DeleteFileRequest, DeleteFileResponse, PasscodeRequest, PrivacyRequest,
    VerifyResponse,
};
use codespace_core::space::validate_space_name;
use codespace_core::{CodespaceError, PrivacyState, PrivacyUpdate, Space, SpaceData, SpaceStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub engine: SyncEngine,
}

impl ApiState {
    fn store(&self) -> &Arc<dyn SpaceStore> {
        self.engine.store()
    }
}

/// Server status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub active_connections: usize,
    pub active_rooms: usize,
}

/// Create API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/codespaces", post(get_or_create_space))
        .route("/codespaces/{name}", get(get_space))
        .route("/codespaces/{name}/status", get(get_space_status))
        .route("/codespaces/{name}/verify", post(verify_passcode))
        .route("/codespaces/{name}/data", post(get_space_data))
        .route("/codespaces/{name}/privacy", patch(update_privacy))
        .route("/codespaces/{name}/delete", delete(delete_file))
        .with_state(state)
}

async fn load(state: &ApiState, name: &str) -> ApiResult<Space> {
    state
        .store()
        .get_by_name(name)
        .await?
        .ok_or_else(|| ApiError(CodespaceError::SpaceNotFound(name.to_string())))
}

/// GET /api/status - Get server status
async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.engine.registry().stats();

    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_connections: stats.active_connections,
        active_rooms: stats.active_rooms,
    })
}

/// POST /api/codespaces - Get a space, creating it with the default file if absent
async fn get_or_create_space(
    State(state): State<ApiState>,
    Json(req): Json<CreateSpaceRequest>,
) -> ApiResult<Response> {
    let name = req.name.unwrap_or_default();
    let name = validate_space_name(name.trim())?;

    let (space, created) = state.store().get_or_create(name).await?;
    if created {
        info!("Created codespace: {}", name);
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let data = SpaceData::from(space);
    let data = if data.is_public {
        data
    } else {
        data.without_files()
    };
    Ok((status, Json(data)).into_response())
}

/// GET /api/codespaces/{name} - Public view; files are withheld from private spaces
async fn get_space(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SpaceData>> {
    let space = load(&state, &name).await?;
    let data = SpaceData::from(space);
    if data.is_public {
        Ok(Json(data))
    } else {
        Ok(Json(data.without_files()))
    }
}

/// GET /api/codespaces/{name}/status - Public/private flag only
async fn get_space_status(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SpaceStatus>> {
    state
        .store()
        .status(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError(CodespaceError::SpaceNotFound(name)))
}

/// POST /api/codespaces/{name}/verify - Check a passcode against a private space
async fn verify_passcode(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<PasscodeRequest>,
) -> ApiResult<Response> {
    let space = load(&state, &name).await?;

    if is_passcode_correct(&space, req.passcode.as_deref()) {
        return Ok(Json(VerifyResponse {
            success: true,
            message: None,
        })
        .into_response());
    }

    Ok((
        StatusCode::UNAUTHORIZED,
        Json(VerifyResponse {
            success: false,
            message: Some(CodespaceError::Unauthorized.to_string()),
        }),
    )
        .into_response())
}

/// POST /api/codespaces/{name}/data - Full space, behind the access gate
async fn get_space_data(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<PasscodeRequest>,
) -> ApiResult<Json<SpaceData>> {
    let space = load(&state, &name).await?;

    if !can_read(&space, req.passcode.as_deref()) {
        return Err(CodespaceError::Unauthorized.into());
    }
    Ok(Json(SpaceData::from(space)))
}

/// PATCH /api/codespaces/{name}/privacy - Set the privacy flag and secret together
///
/// A private space needs its current passcode. The room is told the new flags.
async fn update_privacy(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<PrivacyRequest>,
) -> ApiResult<Json<PrivacyState>> {
    let update = PrivacyUpdate::new(req.is_public, req.passcode.as_deref())?;
    let privacy = state
        .engine
        .update_privacy(&name, req.current_passcode.as_deref(), update)
        .await?;
    Ok(Json(privacy))
}

/// DELETE /api/codespaces/{name}/delete - Remove a file and notify the room
///
/// The returned list is withheld for private spaces, as in the public view.
async fn delete_file(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<DeleteFileRequest>,
) -> ApiResult<Json<DeleteFileResponse>> {
    let file = req
        .file
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| CodespaceError::missing("file"))?;

    let space = state.engine.delete_file(&name, &file).await?;
    let data = SpaceData::from(space);
    let data = if data.is_public {
        data
    } else {
        data.without_files()
    };
    Ok(Json(DeleteFileResponse {
        msg: format!("File '{}' deleted", file),
        codespace: data,
    }))
}
