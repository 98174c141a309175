//! cluehunt-server library interface
//!
//! The validation engine and its collaborators, plus the axum router that
//! exposes them. `main.rs` only wires configuration into [`AppState`].

pub mod api;
pub mod attempt;
pub mod chat;
pub mod clues;
pub mod engine;
pub mod error;
pub mod geofence;
pub mod hints;
pub mod notify;
pub mod progress;
pub mod scoring;

pub use crate::engine::ValidationEngine;
pub use crate::error::{ApiError, ApiResult, HuntError, HuntResult};

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use chrono::{DateTime, Utc};
use cluehunt_common::EventBus;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::clues::ConfigStore;

/// Largest accepted request body (photo uploads)
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValidationEngine>,
    pub config_store: Arc<ConfigStore>,
    /// Event bus feeding the per-team SSE streams
    pub event_bus: EventBus,
    /// Token admin requests must present; `None` leaves admin routes open
    pub admin_token: Option<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        engine: Arc<ValidationEngine>,
        event_bus: EventBus,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            config_store: engine.config_store().clone(),
            engine,
            event_bus,
            admin_token,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let admin = api::admin_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        api::auth::require_admin,
    ));

    Router::new()
        .merge(api::health_routes())
        .merge(api::game_routes())
        .route("/api/teams/:team_id/events", get(api::team_events))
        .merge(admin)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
