//! Player-facing endpoints: join, submissions, hints, chat and clue lookup

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use cluehunt_common::ChatMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::location;
use crate::engine::{
    AnswerOutcome, AnswerSubmission, ChatReply, ClueSummary, PhotoOutcome, PhotoSubmission,
};
use crate::progress::TeamProgress;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub team_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub team_id: String,
    pub clue_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub team_id: String,
}

#[derive(Debug, Serialize)]
pub struct HintResponse {
    pub hint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub team_id: String,
    pub text: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// POST /api/join
pub async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<Json<TeamProgress>> {
    let progress = state.engine.join(&request.team_id).await?;
    Ok(Json(progress))
}

/// POST /api/upload
///
/// Multipart fields: `teamId`, `clueId`, `lat`, `lng` and the image as
/// `photo`. Coordinates that are missing or unparsable count as absent.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<PhotoOutcome>> {
    let mut team_id = None;
    let mut clue_id = None;
    let mut lat = None;
    let mut lng = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read photo: {}", e)))?;
                image = Some(bytes.to_vec());
            }
            "teamId" | "clueId" | "lat" | "lng" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                let value = value.trim().to_string();
                match name.as_str() {
                    "teamId" => team_id = Some(value),
                    "clueId" => clue_id = Some(value),
                    "lat" => lat = value.parse::<f64>().ok(),
                    _ => lng = value.parse::<f64>().ok(),
                }
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let image = image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing image".to_string()))?;
    let team_id = team_id.ok_or_else(|| ApiError::BadRequest("Missing teamId".to_string()))?;
    let clue_id = clue_id.ok_or_else(|| ApiError::BadRequest("Missing clueId".to_string()))?;

    let outcome = state
        .engine
        .submit_photo(PhotoSubmission {
            team_id,
            clue_id,
            location: location(lat, lng),
            image,
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /api/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerOutcome>> {
    let outcome = state
        .engine
        .submit_answer(AnswerSubmission {
            location: location(request.lat, request.lng),
            team_id: request.team_id,
            clue_id: request.clue_id,
            answer: request.answer,
        })
        .await?;
    Ok(Json(outcome))
}

/// POST /api/hint
pub async fn request_hint(
    State(state): State<AppState>,
    Json(request): Json<HintRequest>,
) -> ApiResult<Json<HintResponse>> {
    let hint = state.engine.request_hint(&request.team_id).await?;
    Ok(Json(HintResponse { hint }))
}

/// POST /api/chat
pub async fn send_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    let reply = state
        .engine
        .handle_chat(
            &request.team_id,
            &request.text,
            location(request.lat, request.lng),
        )
        .await?;
    Ok(Json(reply))
}

/// GET /api/clue/:id
pub async fn clue_summary(
    State(state): State<AppState>,
    Path(clue_id): Path<String>,
) -> ApiResult<Json<ClueSummary>> {
    Ok(Json(state.engine.clue_summary(&clue_id)?))
}

/// GET /api/teams/:team_id/progress
pub async fn team_progress(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<TeamProgress>> {
    Ok(Json(state.engine.progress(&team_id).await?))
}

/// GET /api/teams/:team_id/chat
pub async fn chat_history(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Json<Vec<ChatMessage>> {
    Json(state.engine.chat_history(&team_id).await)
}

/// Build player routes
pub fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/api/join", post(join))
        .route("/api/upload", post(upload_photo))
        .route("/api/answer", post(submit_answer))
        .route("/api/hint", post(request_hint))
        .route("/api/chat", post(send_chat))
        .route("/api/clue/:id", get(clue_summary))
        .route("/api/teams/:team_id/progress", get(team_progress))
        .route("/api/teams/:team_id/chat", get(chat_history))
}
