//! Progressive hint selection

use crate::clues::{Clue, ClueGraph, HintKind};
use serde::{Deserialize, Serialize};

/// Tip returned when neither the clue nor the game has any hint configured
pub const DEFAULT_TIP: &str = "Try a different angle, match the view, or read nearby signs.";

/// Position in each hint list for the team's current clue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintCursors {
    pub generic: usize,
    pub photo: usize,
    pub answer: usize,
}

impl HintCursors {
    fn slot(&mut self, kind: HintKind) -> &mut usize {
        match kind {
            HintKind::Generic => &mut self.generic,
            HintKind::Photo => &mut self.photo,
            HintKind::Answer => &mut self.answer,
        }
    }

    pub fn get(&self, kind: HintKind) -> usize {
        match kind {
            HintKind::Generic => self.generic,
            HintKind::Photo => self.photo,
            HintKind::Answer => self.answer,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Pick the next hint of `kind` for `clue`, advancing the matching cursor
///
/// Falls back from the kind's own list to the clue's generic list (still read
/// with the kind's cursor), then to the first global tip, then to
/// [`DEFAULT_TIP`]. Global tips never move a cursor. The cursor stops at the
/// last index, so the final hint repeats.
pub fn next_hint(
    graph: &ClueGraph,
    clue: &Clue,
    cursors: &mut HintCursors,
    kind: HintKind,
) -> String {
    let own = clue.hints.list(kind);
    let list = if own.is_empty() {
        clue.hints.list(HintKind::Generic)
    } else {
        own
    };

    if !list.is_empty() {
        let last = list.len() - 1;
        let cursor = cursors.slot(kind);
        let index = (*cursor).min(last);
        *cursor = (index + 1).min(last);
        return list[index].clone();
    }

    first_tip(graph.wrong_image_tips())
        .or_else(|| first_tip(graph.wrong_answer_tips()))
        .unwrap_or(DEFAULT_TIP)
        .to_string()
}

fn first_tip(tips: &[String]) -> Option<&str> {
    tips.iter().map(|t| t.trim()).find(|t| !t.is_empty())
}
