//! Admin endpoints for editing the game configuration
//!
//! Every mutation is persisted before the response is sent; the new
//! configuration applies to the next request that takes a snapshot.

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::clues::{Clue, ClueUpdate, GameConfig, NewClue};
use crate::{ApiError, ApiResult, AppState};

/// Generic acknowledgement body
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub ok: bool,
    pub image_path: String,
}

/// Body of PUT /api/admin/tips; an omitted list is left unchanged
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipsRequest {
    #[serde(default)]
    pub wrong_image_tips: Option<Vec<String>>,
    #[serde(default)]
    pub wrong_answer_tips: Option<Vec<String>>,
}

/// GET /api/admin/config
pub async fn get_config(State(state): State<AppState>) -> Json<GameConfig> {
    Json(state.config_store.snapshot().config().clone())
}

/// PUT /api/admin/start/:id
pub async fn set_start(
    State(state): State<AppState>,
    Path(clue_id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    state.config_store.set_start_clue(&clue_id).await?;
    Ok(ok())
}

/// POST /api/admin/clue
pub async fn create_clue(
    State(state): State<AppState>,
    Json(new): Json<NewClue>,
) -> ApiResult<Json<Clue>> {
    Ok(Json(state.config_store.create_clue(new).await?))
}

/// PUT /api/admin/clue/:id
pub async fn update_clue(
    State(state): State<AppState>,
    Path(clue_id): Path<String>,
    Json(update): Json<ClueUpdate>,
) -> ApiResult<Json<Clue>> {
    Ok(Json(state.config_store.update_clue(&clue_id, update).await?))
}

/// DELETE /api/admin/clue/:id
pub async fn delete_clue(
    State(state): State<AppState>,
    Path(clue_id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    state.config_store.delete_clue(&clue_id).await?;
    Ok(ok())
}

/// POST /api/admin/clue/:id/image
///
/// Multipart with the image in the `image` field.
pub async fn set_clue_image(
    State(state): State<AppState>,
    Path(clue_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImageResponse>> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;
            image = Some(bytes);
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing image".to_string()))?;
    let image_path = state
        .config_store
        .set_reference_image(&clue_id, &image)
        .await?;

    Ok(Json(ImageResponse {
        ok: true,
        image_path,
    }))
}

/// PUT /api/admin/tips
pub async fn set_tips(
    State(state): State<AppState>,
    Json(tips): Json<TipsRequest>,
) -> ApiResult<Json<OkResponse>> {
    state
        .config_store
        .set_tips(tips.wrong_image_tips, tips.wrong_answer_tips)
        .await?;
    Ok(ok())
}

/// Build admin routes (the caller attaches the auth layer)
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/config", get(get_config))
        .route("/api/admin/start/:id", put(set_start))
        .route("/api/admin/clue", post(create_clue))
        .route("/api/admin/clue/:id", put(update_clue).delete(delete_clue))
        .route("/api/admin/clue/:id/image", post(set_clue_image))
        .route("/api/admin/tips", put(set_tips))
}
