//! Per-team progress records
//!
//! [`ProgressStore`] is the only owner of team state. Each team's record sits
//! behind its own `tokio::sync::Mutex`, so one team's submissions run one at a
//! time while different teams never contend. The outer map lock is held only
//! long enough to look up or insert a handle.

use crate::attempt::Satisfaction;
use crate::geofence::GeoPoint;
use crate::hints::HintCursors;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Mutable state of one team
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProgress {
    pub team_id: String,
    pub current_clue_id: String,
    /// Completed clue ids, oldest first
    pub history: Vec<String>,
    pub satisfaction: Satisfaction,
    pub hint_cursors: HintCursors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_known_location: Option<GeoPoint>,
}

impl TeamProgress {
    pub fn new(team_id: impl Into<String>, start_clue_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            current_clue_id: start_clue_id.into(),
            history: Vec::new(),
            satisfaction: Satisfaction::default(),
            hint_cursors: HintCursors::default(),
            last_known_location: None,
        }
    }

    /// Record the current clue as solved and move to `next`
    ///
    /// With no successor the team stays on the solved clue. Partial proof and
    /// hint cursors always start over.
    pub fn advance(&mut self, next: Option<&str>) {
        self.history.push(self.current_clue_id.clone());
        if let Some(next) = next {
            self.current_clue_id = next.to_string();
        }
        self.satisfaction = Satisfaction::default();
        self.hint_cursors.reset();
    }

    /// Submitted point, else the last known one, else an unknown point
    pub fn resolve_location(&self, submitted: Option<GeoPoint>) -> GeoPoint {
        submitted
            .or(self.last_known_location)
            .unwrap_or_else(GeoPoint::unknown)
    }

    /// Remember a reported point; unknown points are ignored
    pub fn remember_location(&mut self, point: Option<GeoPoint>) {
        if let Some(point) = point.filter(GeoPoint::is_known) {
            self.last_known_location = Some(point);
        }
    }
}

/// Shared handle to one team's record
pub type TeamHandle = Arc<Mutex<TeamProgress>>;

/// All team records, created lazily on join
#[derive(Default)]
pub struct ProgressStore {
    teams: RwLock<HashMap<String, TeamHandle>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the team's record, creating it at `start_clue_id` if absent
    ///
    /// Returns the handle and whether it was just created.
    pub async fn join(&self, team_id: &str, start_clue_id: &str) -> (TeamHandle, bool) {
        if let Some(handle) = self.get(team_id).await {
            return (handle, false);
        }

        let mut teams = self.teams.write().await;
        // Another join may have won the race between the two locks
        if let Some(handle) = teams.get(team_id) {
            return (handle.clone(), false);
        }
        let handle = Arc::new(Mutex::new(TeamProgress::new(team_id, start_clue_id)));
        teams.insert(team_id.to_string(), handle.clone());
        (handle, true)
    }

    pub async fn get(&self, team_id: &str) -> Option<TeamHandle> {
        self.teams.read().await.get(team_id).cloned()
    }

    /// Copy of the team's current record
    pub async fn snapshot(&self, team_id: &str) -> Option<TeamProgress> {
        let handle = self.get(team_id).await?;
        let progress = handle.lock().await;
        Some(progress.clone())
    }

    pub async fn team_count(&self) -> usize {
        self.teams.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_resets_partial_state() {
        let mut progress = TeamProgress::new("red", "a");
        progress.satisfaction.photo = true;
        progress.hint_cursors.answer = 2;

        progress.advance(Some("b"));

        assert_eq!(progress.current_clue_id, "b");
        assert_eq!(progress.history, ["a"]);
        assert_eq!(progress.satisfaction, Satisfaction::default());
        assert_eq!(progress.hint_cursors, HintCursors::default());
    }

    #[test]
    fn test_terminal_advance_stays_in_place() {
        let mut progress = TeamProgress::new("red", "last");
        progress.advance(None);
        assert_eq!(progress.current_clue_id, "last");
        assert_eq!(progress.history, ["last"]);
    }

    #[test]
    fn test_location_fallback_order() {
        let mut progress = TeamProgress::new("red", "a");
        assert!(!progress.resolve_location(None).is_known());

        progress.remember_location(Some(GeoPoint::new(1.0, 2.0)));
        progress.remember_location(Some(GeoPoint::unknown()));
        assert_eq!(progress.resolve_location(None), GeoPoint::new(1.0, 2.0));
        assert_eq!(
            progress.resolve_location(Some(GeoPoint::new(3.0, 4.0))),
            GeoPoint::new(3.0, 4.0)
        );
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let store = ProgressStore::new();
        let (first, created) = store.join("red", "a").await;
        assert!(created);
        first.lock().await.current_clue_id = "b".to_string();

        let (second, created) = store.join("red", "a").await;
        assert!(!created);
        assert_eq!(second.lock().await.current_clue_id, "b");
        assert_eq!(store.team_count().await, 1);
        assert!(store.snapshot("blue").await.is_none());
    }
}
