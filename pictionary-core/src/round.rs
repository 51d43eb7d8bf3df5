use std::collections::VecDeque;

use pictionary_types::{
    GUESS_HISTORY_LIMIT, Guess, Recognition, RoundId, RoundOutcome, RoundResult, RoundStatus,
    RoundView, Word,
};
use uuid::Uuid;

/// Default length of a round, in seconds.
pub const DEFAULT_ROUND_SECONDS: u32 = 120;

/// One timed attempt to get a word recognized from a drawing.
///
/// The round only changes while it is `Active`. Every mutator returns the
/// outcome when it is the call that ends the round, and is a no-op once
/// the round is terminal.
#[derive(Debug, Clone)]
pub struct Round {
    pub id: RoundId,
    pub word: Word,
    pub duration_seconds: u32,
    pub started_at: String, // ISO 8601 string
    remaining_seconds: u32,
    guess_history: VecDeque<Guess>,
    attempt_count: u32,
    status: RoundStatus,
}

impl Round {
    pub fn start(word: Word, duration_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            word,
            duration_seconds,
            started_at: chrono::Utc::now().to_rfc3339(),
            remaining_seconds: duration_seconds,
            guess_history: VecDeque::with_capacity(GUESS_HISTORY_LIMIT),
            attempt_count: 0,
            status: RoundStatus::Active,
        }
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> Option<RoundOutcome> {
        if !self.is_active() {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.status = RoundStatus::TimedOut;
            tracing::debug!("Round {} timed out on '{}'", self.id, self.word.text);
            return self.outcome();
        }

        None
    }

    /// Merge a recognizer response into the guess history.
    ///
    /// An empty response (throttled call) leaves the round untouched.
    pub fn record(&mut self, recognition: &Recognition) -> Option<RoundOutcome> {
        if !self.is_active() || recognition.is_empty() {
            return None;
        }

        let observed_at = chrono::Utc::now().to_rfc3339();
        let mut succeeded = false;
        for text in recognition.guesses.iter().take(GUESS_HISTORY_LIMIT) {
            let is_correct =
                recognition.is_correct && recognition.matched_guess.as_deref() == Some(text.as_str());
            succeeded |= is_correct;

            self.guess_history.push_back(Guess {
                text: text.clone(),
                is_correct,
                observed_at: observed_at.clone(),
            });
            self.attempt_count += 1;

            while self.guess_history.len() > GUESS_HISTORY_LIMIT {
                self.guess_history.pop_front();
            }
        }

        // Only a recorded correct guess ends the round
        if succeeded {
            self.status = RoundStatus::Succeeded;
            tracing::debug!(
                "Round {} succeeded with {:?} after {} guesses",
                self.id,
                recognition.matched_guess,
                self.attempt_count
            );
            return self.outcome();
        }

        None
    }

    /// Player left the round before it ended
    pub fn abandon(&mut self) -> Option<RoundOutcome> {
        if !self.is_active() {
            return None;
        }

        self.status = RoundStatus::Abandoned;
        self.outcome()
    }

    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.duration_seconds - self.remaining_seconds
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn guess_history(&self) -> impl Iterator<Item = &Guess> {
        self.guess_history.iter()
    }

    /// Final result, available once the round has left `Active`
    pub fn outcome(&self) -> Option<RoundOutcome> {
        let result = match self.status {
            RoundStatus::Active => return None,
            RoundStatus::Succeeded => RoundResult::Success,
            RoundStatus::TimedOut => RoundResult::Timeout,
            RoundStatus::Abandoned => RoundResult::Abandoned,
        };

        Some(RoundOutcome {
            result,
            word: self.word.text.clone(),
            emoji: self.word.emoji.clone(),
            elapsed_seconds: self.elapsed_seconds(),
            attempt_count: self.attempt_count,
        })
    }

    pub fn view(&self) -> RoundView {
        RoundView {
            id: self.id,
            word: self.word.text.clone(),
            emoji: self.word.emoji.clone(),
            difficulty: self.word.difficulty,
            duration_seconds: self.duration_seconds,
            remaining_seconds: self.remaining_seconds,
            guess_history: self.guess_history.iter().cloned().collect(),
            attempt_count: self.attempt_count,
            status: self.status,
            started_at: self.started_at.clone(),
            outcome: self.outcome(),
        }
    }
}
