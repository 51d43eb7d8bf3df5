use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoundError {
    NoActiveRound,
    RoundAlreadyFinished,
    WordUnavailable { reason: String },
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundError::NoActiveRound => write!(f, "No round in progress"),
            RoundError::RoundAlreadyFinished => write!(f, "Round already finished"),
            RoundError::WordUnavailable { reason } => write!(f, "No word available: {}", reason),
        }
    }
}

impl std::error::Error for RoundError {}
