//! Team chat log and chat intent classification

use crate::clues::ValidationMode;
use cluehunt_common::ChatMessage;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Bounded per-team chat history
///
/// Once a team's log reaches `limit`, each append evicts the oldest message.
/// The engine only writes here; nothing reads the log back to make decisions.
pub struct ChatLog {
    limit: usize,
    logs: RwLock<HashMap<String, VecDeque<ChatMessage>>>,
}

impl ChatLog {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            logs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn append(&self, team_id: &str, message: ChatMessage) {
        let mut logs = self.logs.write().await;
        let log = logs.entry(team_id.to_string()).or_default();
        log.push_back(message);
        while log.len() > self.limit {
            log.pop_front();
        }
    }

    /// Team's messages, oldest first
    pub async fn history(&self, team_id: &str) -> Vec<ChatMessage> {
        self.logs
            .read()
            .await
            .get(team_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// What a free-text chat message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent<'a> {
    /// Distance to the current target
    Where,
    /// Next generic hint
    Hint,
    /// Answer attempt, prefix already stripped
    Answer(&'a str),
    /// Nothing recognized
    Unrecognized,
}

/// Classify a chat message for a clue with the given mode
///
/// Checked in order: location words, hint words, then (only when the mode
/// accepts answers) the text as an answer.
pub fn classify(text: &str, mode: ValidationMode) -> Intent<'_> {
    let lower = text.to_lowercase();
    let has_word = |words: &[&str]| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| words.contains(&word))
    };

    if has_word(&["where", "distance", "far"]) {
        Intent::Where
    } else if has_word(&["hint", "help"]) {
        Intent::Hint
    } else if mode.requires_qa() {
        Intent::Answer(strip_answer_prefix(text))
    } else {
        Intent::Unrecognized
    }
}

/// Drop a leading `answer:`, `answer ` or `a:` marker
pub fn strip_answer_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    for prefix in ["answer", "a"] {
        let Some(head) = trimmed.get(..prefix.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            continue;
        }
        let rest = &trimmed[prefix.len()..];
        let marked = rest.starts_with(':')
            || (prefix == "answer" && rest.starts_with(char::is_whitespace));
        if marked {
            return rest.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        }
    }
    trimmed
}
