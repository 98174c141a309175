//! Progress validation engine
//!
//! Every team-facing operation follows the same shape: take one config
//! snapshot, lock the team's record, validate the request against it, score
//! the proof, run [`attempt::evaluate`], then commit and notify. The team lock
//! is held across scoring, so a photo and an answer for the same team can
//! never interleave. A request that fails validation or scoring returns
//! before anything in the record is written.

use crate::attempt::{self, Attempt, Proof};
use crate::chat::{classify, ChatLog, Intent};
use crate::clues::{Clue, ClueGraph, ConfigStore, HintKind, ValidationMode};
use crate::error::{HuntError, HuntResult};
use crate::geofence::{self, FenceCheck, GeoPoint};
use crate::hints::next_hint;
use crate::notify::NotificationChannel;
use crate::progress::{ProgressStore, TeamHandle, TeamProgress};
use crate::scoring::{text_similarity, ImageScorer, PixelDiffScorer, ScoreError};
use cluehunt_common::config::{ValidationConfig, DEFAULT_CHAT_HISTORY_LIMIT};
use cluehunt_common::{ChatMessage, TeamEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CHAT_FALLBACK: &str = r#"Try sending "hint", "where", or start your answer with "answer:"."#;

/// Engine tuning taken from the resolved server configuration
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub thresholds: ValidationConfig,
    pub chat_history_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: ValidationConfig::default(),
            chat_history_limit: DEFAULT_CHAT_HISTORY_LIMIT,
        }
    }
}

/// Photo submission after transport decoding
#[derive(Debug, Clone)]
pub struct PhotoSubmission {
    pub team_id: String,
    pub clue_id: String,
    pub location: Option<GeoPoint>,
    pub image: Vec<u8>,
}

/// Answer submission after transport decoding
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub team_id: String,
    pub clue_id: String,
    pub location: Option<GeoPoint>,
    pub answer: String,
}

/// Result of a photo submission
///
/// A NaN `distance` (no location known) serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoOutcome {
    #[serde(rename = "ok")]
    pub advanced: bool,
    pub geo_ok: bool,
    pub img_ok: bool,
    pub similarity: f64,
    pub distance: f64,
}

/// Result of an answer submission
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    #[serde(rename = "ok")]
    pub advanced: bool,
    pub geo_ok: bool,
    pub ans_ok: bool,
    pub similarity: f64,
    pub distance: f64,
}

/// What a chat message was understood as
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum ChatReply {
    /// Distance to the target; NaN (serialized as `null`) when unknown
    Where { distance: f64 },
    Hint { hint: String },
    Answer(AnswerOutcome),
    Unrecognized,
}

/// Public view of a clue; never includes the reference image or the answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueSummary {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: f64,
    pub require_photo: bool,
    #[serde(rename = "requireQA")]
    pub require_qa: bool,
    pub question: String,
    pub validation_mode: ValidationMode,
}

impl From<&Clue> for ClueSummary {
    fn from(clue: &Clue) -> Self {
        Self {
            id: clue.id.clone(),
            name: clue.name.clone(),
            lat: clue.location.lat,
            lng: clue.location.lng,
            radius_meters: clue.radius_meters,
            require_photo: clue.require_photo,
            require_qa: clue.require_qa,
            question: clue.question.clone(),
            validation_mode: clue.mode,
        }
    }
}

/// The per-team validation state machine
pub struct ValidationEngine {
    config: Arc<ConfigStore>,
    progress: ProgressStore,
    chat: ChatLog,
    notifier: Arc<dyn NotificationChannel>,
    scorer: Arc<dyn ImageScorer>,
    thresholds: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(
        config: Arc<ConfigStore>,
        notifier: Arc<dyn NotificationChannel>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            config,
            progress: ProgressStore::new(),
            chat: ChatLog::new(settings.chat_history_limit),
            notifier,
            scorer: Arc::new(PixelDiffScorer::default()),
            thresholds: settings.thresholds,
        }
    }

    /// Replace the photo scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn ImageScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Register a team (idempotent) and greet it
    ///
    /// Publishes the team's current clue as a `state` event and appends a
    /// welcome message, whether or not the team already existed.
    pub async fn join(&self, team_id: &str) -> HuntResult<TeamProgress> {
        let team_id = team_id.trim();
        if team_id.is_empty() {
            return Err(HuntError::InvalidInput("teamId required".to_string()));
        }

        let graph = self.config.snapshot();
        if graph.clues().is_empty() {
            return Err(HuntError::InvalidClue(graph.start_clue_id().to_string()));
        }

        let (handle, created) = self.progress.join(team_id, graph.start_clue_id()).await;
        let progress = handle.lock().await;
        let clue_name = graph
            .clue(&progress.current_clue_id)
            .map(|clue| clue.name.as_str())
            .unwrap_or(progress.current_clue_id.as_str());

        if created {
            info!(team_id = %team_id, clue_id = %progress.current_clue_id, "Team joined");
        } else {
            debug!(team_id = %team_id, "Team rejoined");
        }

        self.notifier.publish(
            team_id,
            TeamEvent::State {
                current_clue_id: progress.current_clue_id.clone(),
                hint: format!("Start at: {}", clue_name),
            },
        );
        self.say(
            team_id,
            ChatMessage::bot(format!(
                "Welcome! You are at clue \"{}\". Ask for a hint or send your answer.",
                clue_name
            )),
        )
        .await;

        Ok(progress.clone())
    }

    /// Score a photo against the current clue and advance if the mode allows
    pub async fn submit_photo(&self, submission: PhotoSubmission) -> HuntResult<PhotoOutcome> {
        let graph = self.config.snapshot();
        let handle = self.team(&submission.team_id).await?;
        let mut progress = handle.lock().await;
        let clue = current_clue(&graph, &progress, &submission.clue_id)?;

        let fence = fence_check(&progress, clue, submission.location);
        let (similarity, img_ok) = if clue.mode.requires_photo() {
            let similarity = self.score_photo(clue, submission.image).await?;
            (similarity, similarity >= self.thresholds.photo_threshold)
        } else {
            (1.0, true)
        };
        debug!(
            team_id = %progress.team_id,
            clue_id = %clue.id,
            similarity,
            distance = fence.distance_meters,
            "Photo scored"
        );

        progress.remember_location(submission.location);
        let attempt = attempt::evaluate(
            clue.mode,
            progress.satisfaction,
            Proof::Photo { accepted: img_ok },
            fence.within,
        );

        match attempt {
            Attempt::Advanced => {
                self.advance(&graph, clue, &mut progress, "Photo accepted.")
                    .await;
            }
            Attempt::Pending(satisfaction) => {
                progress.satisfaction = satisfaction;
                if !img_ok {
                    let tip = next_hint(&graph, clue, &mut progress.hint_cursors, HintKind::Photo);
                    self.say(&progress.team_id, ChatMessage::bot(format!("Hint: {}", tip)))
                        .await;
                }
            }
        }

        Ok(PhotoOutcome {
            advanced: attempt.is_advanced(),
            geo_ok: fence.within,
            img_ok,
            similarity,
            distance: fence.distance_meters,
        })
    }

    /// Check an answer against the current clue and advance if the mode allows
    ///
    /// The answer is logged to the team chat as `answer: <text>`.
    pub async fn submit_answer(&self, submission: AnswerSubmission) -> HuntResult<AnswerOutcome> {
        let graph = self.config.snapshot();
        let handle = self.team(&submission.team_id).await?;
        let mut progress = handle.lock().await;
        let clue = current_clue(&graph, &progress, &submission.clue_id)?;

        self.say(
            &progress.team_id,
            ChatMessage::user(format!("answer: {}", submission.answer)),
        )
        .await;

        Ok(self
            .evaluate_answer(
                &graph,
                clue,
                &mut progress,
                &submission.answer,
                submission.location,
            )
            .await)
    }

    /// Next generic hint for the team's current clue
    pub async fn request_hint(&self, team_id: &str) -> HuntResult<String> {
        let graph = self.config.snapshot();
        let handle = self.team(team_id).await?;
        let mut progress = handle.lock().await;
        let clue = graph
            .clue(&progress.current_clue_id)
            .ok_or_else(|| HuntError::InvalidClue(progress.current_clue_id.clone()))?;

        let hint = next_hint(&graph, clue, &mut progress.hint_cursors, HintKind::Generic);
        self.say(&progress.team_id, ChatMessage::bot(format!("Hint: {}", hint)))
            .await;
        Ok(hint)
    }

    /// Handle a free-text chat message from a team
    ///
    /// The message and every bot reply go to the team's chat log; the return
    /// value says which intent was recognized and what it produced.
    pub async fn handle_chat(
        &self,
        team_id: &str,
        text: &str,
        location: Option<GeoPoint>,
    ) -> HuntResult<ChatReply> {
        let team_id = team_id.trim();
        let text = text.trim();
        if text.is_empty() {
            return Err(HuntError::InvalidInput("text required".to_string()));
        }

        let graph = self.config.snapshot();
        let handle = self.team(team_id).await?;
        let mut progress = handle.lock().await;
        let clue = graph
            .clue(&progress.current_clue_id)
            .ok_or_else(|| HuntError::InvalidClue(progress.current_clue_id.clone()))?;

        self.say(team_id, ChatMessage::user(text)).await;

        let reply = match classify(text, clue.mode) {
            Intent::Where => {
                let fence = fence_check(&progress, clue, location);
                progress.remember_location(location);
                let message = if fence.distance_meters.is_finite() {
                    format!(
                        "You are {}m from the target circle.",
                        fence.distance_meters.round() as i64
                    )
                } else {
                    "I don't know where you are yet. Share your location and ask again."
                        .to_string()
                };
                self.say(team_id, ChatMessage::bot(message)).await;
                ChatReply::Where {
                    distance: fence.distance_meters,
                }
            }
            Intent::Hint => {
                progress.remember_location(location);
                let hint = next_hint(&graph, clue, &mut progress.hint_cursors, HintKind::Generic);
                self.say(team_id, ChatMessage::bot(format!("Hint: {}", hint)))
                    .await;
                ChatReply::Hint { hint }
            }
            Intent::Answer(answer) => ChatReply::Answer(
                self.evaluate_answer(&graph, clue, &mut progress, answer, location)
                    .await,
            ),
            Intent::Unrecognized => {
                progress.remember_location(location);
                self.say(team_id, ChatMessage::bot(CHAT_FALLBACK)).await;
                ChatReply::Unrecognized
            }
        };

        Ok(reply)
    }

    /// Public summary of a clue
    pub fn clue_summary(&self, clue_id: &str) -> HuntResult<ClueSummary> {
        let graph = self.config.snapshot();
        graph.clue(clue_id).map(ClueSummary::from).ok_or_else(|| {
            HuntError::Common(cluehunt_common::Error::NotFound(format!(
                "clue '{}'",
                clue_id
            )))
        })
    }

    /// Copy of a team's progress record
    pub async fn progress(&self, team_id: &str) -> HuntResult<TeamProgress> {
        let team_id = team_id.trim();
        self.progress
            .snapshot(team_id)
            .await
            .ok_or_else(|| HuntError::NotJoined(team_id.to_string()))
    }

    /// Team's recent chat, oldest first
    pub async fn chat_history(&self, team_id: &str) -> Vec<ChatMessage> {
        self.chat.history(team_id.trim()).await
    }

    /// Handle of a joined team; ids are compared after trimming, as on join
    async fn team(&self, team_id: &str) -> HuntResult<TeamHandle> {
        let team_id = team_id.trim();
        self.progress
            .get(team_id)
            .await
            .ok_or_else(|| HuntError::NotJoined(team_id.to_string()))
    }

    pub async fn team_count(&self) -> usize {
        self.progress.team_count().await
    }

    /// Shared answer path for `submit_answer` and chat answers
    ///
    /// Caller holds the team lock and has already logged the user's text.
    async fn evaluate_answer(
        &self,
        graph: &ClueGraph,
        clue: &Clue,
        progress: &mut TeamProgress,
        answer: &str,
        location: Option<GeoPoint>,
    ) -> AnswerOutcome {
        let fence = fence_check(progress, clue, location);
        let (similarity, ans_ok) = if clue.mode.requires_qa() {
            let similarity = text_similarity(answer, &clue.expected_answer);
            (similarity, similarity >= self.thresholds.answer_threshold)
        } else {
            (1.0, true)
        };
        debug!(
            team_id = %progress.team_id,
            clue_id = %clue.id,
            similarity,
            distance = fence.distance_meters,
            "Answer scored"
        );

        progress.remember_location(location);
        let attempt = attempt::evaluate(
            clue.mode,
            progress.satisfaction,
            Proof::Answer { accepted: ans_ok },
            fence.within,
        );

        match attempt {
            Attempt::Advanced => {
                self.advance(graph, clue, progress, "Answer accepted.").await;
            }
            Attempt::Pending(satisfaction) => {
                progress.satisfaction = satisfaction;
                if !ans_ok {
                    self.say(&progress.team_id, ChatMessage::bot("Answer not accepted."))
                        .await;
                    let tip = next_hint(graph, clue, &mut progress.hint_cursors, HintKind::Answer);
                    self.say(&progress.team_id, ChatMessage::bot(format!("Hint: {}", tip)))
                        .await;
                } else if clue.mode.requires_qa() {
                    let reply = if fence.within {
                        "Answer accepted. Submit a photo to continue."
                    } else {
                        "Answer accepted. Move closer to the target circle."
                    };
                    self.say(&progress.team_id, ChatMessage::bot(reply)).await;
                }
            }
        }

        AnswerOutcome {
            advanced: attempt.is_advanced(),
            geo_ok: fence.within,
            ans_ok,
            similarity,
            distance: fence.distance_meters,
        }
    }

    /// Move the team past `clue` and announce it
    async fn advance(
        &self,
        graph: &ClueGraph,
        clue: &Clue,
        progress: &mut TeamProgress,
        accepted: &str,
    ) {
        let next = graph.successor(clue).map(|next| next.id.clone());
        if next.is_none() {
            if let Some(dangling) = &clue.next_clue_id {
                warn!(
                    clue_id = %clue.id,
                    next_clue_id = %dangling,
                    "Successor clue missing, team stays in place"
                );
            }
        }

        progress.advance(next.as_deref());
        let done = next.is_none();
        info!(
            team_id = %progress.team_id,
            from = %clue.id,
            to = %progress.current_clue_id,
            done,
            "Team advanced"
        );

        self.notifier.publish(
            &progress.team_id,
            TeamEvent::Progress {
                next_clue_id: next,
                done,
            },
        );

        let mut text = accepted.to_string();
        if !clue.success_message.trim().is_empty() {
            text.push(' ');
            text.push_str(clue.success_message.trim());
        }
        if done {
            text.push_str(" Hunt complete!");
        }
        self.say(&progress.team_id, ChatMessage::bot(text)).await;
    }

    /// Run the photo scorer on the blocking pool
    async fn score_photo(&self, clue: &Clue, candidate: Vec<u8>) -> HuntResult<f64> {
        let missing = || HuntError::ReferenceImageMissing(clue.id.clone());
        let path = self.config.reference_image_path(clue).ok_or_else(missing)?;
        let reference = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(clue_id = %clue.id, "Reference image not found at {}", path.display());
                return Err(missing());
            }
            Err(e) => return Err(e.into()),
        };

        let scorer = self.scorer.clone();
        let scored = tokio::task::spawn_blocking(move || scorer.similarity(&reference, &candidate))
            .await
            .map_err(|e| HuntError::Internal(format!("scoring task failed: {}", e)))?;

        match scored {
            Ok(similarity) => Ok(similarity.clamp(0.0, 1.0)),
            Err(ScoreError::Decode {
                which: "candidate",
                source,
            }) => Err(HuntError::Decode(source.to_string())),
            Err(e) => Err(HuntError::Internal(format!(
                "clue '{}': {}",
                clue.id, e
            ))),
        }
    }

    async fn say(&self, team_id: &str, message: ChatMessage) {
        self.chat.append(team_id, message.clone()).await;
        self.notifier.publish(team_id, TeamEvent::ChatMessage(message));
    }
}

/// Resolve the clue a submission targets, rejecting stale or unknown ids
fn current_clue<'g>(
    graph: &'g ClueGraph,
    progress: &TeamProgress,
    clue_id: &str,
) -> HuntResult<&'g Clue> {
    if progress.current_clue_id != clue_id {
        warn!(
            team_id = %progress.team_id,
            expected = %progress.current_clue_id,
            submitted = %clue_id,
            "Stale submission rejected"
        );
        return Err(HuntError::StaleSubmission {
            expected: progress.current_clue_id.clone(),
            submitted: clue_id.to_string(),
        });
    }
    graph
        .clue(clue_id)
        .ok_or_else(|| HuntError::InvalidClue(clue_id.to_string()))
}

fn fence_check(progress: &TeamProgress, clue: &Clue, submitted: Option<GeoPoint>) -> FenceCheck {
    let point = progress.resolve_location(submitted);
    geofence::check(point, clue.location, clue.radius_meters)
}
