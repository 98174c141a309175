//! HTTP API handlers for cluehunt-server
//!
//! Player routes live under `/api`, admin routes under `/api/admin` behind
//! the [`auth::require_admin`] middleware, and each team has an SSE stream.

pub mod admin;
pub mod auth;
pub mod game;
pub mod health;
pub mod sse;

pub use admin::admin_routes;
pub use game::game_routes;
pub use health::health_routes;
pub use sse::team_events;

use crate::geofence::GeoPoint;

/// Location from optional request coordinates; both must be present
pub(crate) fn location(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    }
}
