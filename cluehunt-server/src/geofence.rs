//! Geofence containment on a spherical earth

use serde::{Deserialize, Serialize};

/// Mean earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// WGS84 latitude/longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Point used when a submission carries no location and none is known
    ///
    /// Every distance from it is NaN, so it is never inside a fence.
    pub fn unknown() -> Self {
        Self {
            lat: f64::NAN,
            lng: f64::NAN,
        }
    }

    pub fn is_known(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Result of testing a point against a fence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceCheck {
    pub distance_meters: f64,
    pub within: bool,
}

/// Great-circle distance in meters
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Distance to `center` and whether `point` lies inside the fence
///
/// The boundary is inclusive. NaN coordinates yield a NaN distance and fail
/// closed.
pub fn check(point: GeoPoint, center: GeoPoint, radius_meters: f64) -> FenceCheck {
    let distance_meters = haversine_meters(point, center);
    FenceCheck {
        distance_meters,
        within: distance_meters <= radius_meters,
    }
}

/// Whether `point` lies inside the fence around `center`
pub fn within_fence(point: GeoPoint, center: GeoPoint, radius_meters: f64) -> bool {
    check(point, center, radius_meters).within
}
