#![allow(dead_code)]

use pictionary_core::{Round, RoundEvent, RoundEventHandler, WordCatalog, guess_matcher};
use pictionary_types::{Difficulty, Recognition, Word};
use std::sync::{Arc, Mutex};

/// Creates a catalog with a known set of words
pub fn create_test_catalog() -> WordCatalog {
    WordCatalog::new(vec![
        Word::new("CAR", "🚗", Difficulty::Easy),
        Word::new("HOUSE", "🏠", Difficulty::Easy),
        Word::new("PHONE", "📱", Difficulty::Medium),
        Word::new("SMILE", "😊", Difficulty::Easy),
        Word::new("DRAGON", "🐉", Difficulty::Hard),
    ])
}

/// Creates a round for a specific target word
pub fn create_round_with_word(text: &str, duration_seconds: u32) -> Round {
    Round::start(Word::new(text, "❓", Difficulty::Easy), duration_seconds)
}

/// Builds a recognizer response the way a recognizer would
pub fn recognition_for(guesses: &[&str], target: &str) -> Recognition {
    guess_matcher::evaluate(guesses.iter().map(|g| g.to_string()).collect(), target)
}

/// Advance the round countdown by `seconds` ticks
pub fn advance(round: &mut Round, seconds: u32) {
    for _ in 0..seconds {
        round.tick();
    }
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<RoundEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<RoundEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&RoundEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl RoundEventHandler for EventCollector {
    fn handle_event(&mut self, event: RoundEvent) {
        self.events.lock().unwrap().push(event);
    }
}
