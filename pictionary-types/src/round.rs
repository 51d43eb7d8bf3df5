use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Difficulty, RoundId};

/// Maximum number of guesses a round keeps on screen.
pub const GUESS_HISTORY_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Guess {
    pub text: String,
    pub is_correct: bool,
    pub observed_at: String, // ISO 8601 string
}

/// Ranked guesses returned by a recognizer for one drawing snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Recognition {
    pub guesses: Vec<String>,
    pub is_correct: bool,
    pub matched_guess: Option<String>,
}

impl Recognition {
    /// Result handed back when a call is throttled.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawingPoint {
    pub x: f32,
    pub y: f32,
    pub timestamp: i64, // milliseconds since epoch
}

pub type DrawingStroke = Vec<DrawingPoint>;

/// Drawing state sent to the recognizer at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawingSnapshot {
    pub strokes: Vec<DrawingStroke>,
    /// Rendered canvas as base64 PNG, without the data URL prefix
    #[serde(default)]
    pub image_base64: Option<String>,
}

impl DrawingSnapshot {
    pub fn from_strokes(strokes: Vec<DrawingStroke>) -> Self {
        Self {
            strokes,
            image_base64: None,
        }
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoundStatus {
    Active,
    Succeeded,
    TimedOut,
    Abandoned,
}

impl RoundStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoundStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoundResult {
    Success,
    Timeout,
    Abandoned,
}

/// Payload handed to the results screen once a round ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundOutcome {
    pub result: RoundResult,
    pub word: String,
    pub emoji: String,
    pub elapsed_seconds: u32,
    pub attempt_count: u32,
}

/// Client-facing snapshot of a round, including the target word the
/// player is drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundView {
    pub id: RoundId,
    pub word: String,
    pub emoji: String,
    pub difficulty: Difficulty,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub guess_history: Vec<Guess>,
    pub attempt_count: u32,
    pub status: RoundStatus,
    pub started_at: String,
    pub outcome: Option<RoundOutcome>,
}
