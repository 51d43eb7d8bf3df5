use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A catalog entry the player is asked to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Word {
    #[serde(rename = "word")]
    pub text: String,
    pub emoji: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Word {
    pub fn new(text: impl Into<String>, emoji: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            text: text.into(),
            emoji: emoji.into(),
            difficulty,
        }
    }
}
