use pictionary_types::{Guess, RoundId, RoundOutcome};

#[derive(Debug, Clone)]
pub enum RoundEvent {
    RoundStarted {
        round_id: RoundId,
        word: String,
        duration_seconds: u32,
    },
    GuessesReceived {
        round_id: RoundId,
        guesses: Vec<Guess>,
    },
    RoundSucceeded {
        round_id: RoundId,
        outcome: RoundOutcome,
    },
    RoundTimedOut {
        round_id: RoundId,
        outcome: RoundOutcome,
    },
    RoundAbandoned {
        round_id: RoundId,
        outcome: RoundOutcome,
    },
}

impl RoundEvent {
    pub fn round_id(&self) -> RoundId {
        match self {
            RoundEvent::RoundStarted { round_id, .. } => *round_id,
            RoundEvent::GuessesReceived { round_id, .. } => *round_id,
            RoundEvent::RoundSucceeded { round_id, .. } => *round_id,
            RoundEvent::RoundTimedOut { round_id, .. } => *round_id,
            RoundEvent::RoundAbandoned { round_id, .. } => *round_id,
        }
    }

    /// Build the terminal event matching an outcome
    pub fn finished(round_id: RoundId, outcome: RoundOutcome) -> Self {
        match outcome.result {
            pictionary_types::RoundResult::Success => RoundEvent::RoundSucceeded { round_id, outcome },
            pictionary_types::RoundResult::Timeout => RoundEvent::RoundTimedOut { round_id, outcome },
            pictionary_types::RoundResult::Abandoned => RoundEvent::RoundAbandoned { round_id, outcome },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            RoundEvent::RoundStarted { .. } | RoundEvent::GuessesReceived { .. }
        )
    }
}

/// Event handler trait for processing round events
pub trait RoundEventHandler: Send {
    fn handle_event(&mut self, event: RoundEvent);
}

/// Simple event bus for distributing round events
pub struct RoundEventBus {
    handlers: Vec<Box<dyn RoundEventHandler>>,
}

impl RoundEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn RoundEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: RoundEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for RoundEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes every event to the tracing log
pub struct TracingEventHandler;

impl RoundEventHandler for TracingEventHandler {
    fn handle_event(&mut self, event: RoundEvent) {
        match &event {
            RoundEvent::RoundStarted {
                round_id,
                word,
                duration_seconds,
            } => tracing::info!("Round {} started: '{}' for {}s", round_id, word, duration_seconds),
            RoundEvent::GuessesReceived { round_id, guesses } => tracing::debug!(
                "Round {} received guesses: {:?}",
                round_id,
                guesses.iter().map(|g| g.text.as_str()).collect::<Vec<_>>()
            ),
            RoundEvent::RoundSucceeded { round_id, outcome }
            | RoundEvent::RoundTimedOut { round_id, outcome }
            | RoundEvent::RoundAbandoned { round_id, outcome } => tracing::info!(
                "Round {} finished: {:?} on '{}' after {}s and {} guesses",
                round_id,
                outcome.result,
                outcome.word,
                outcome.elapsed_seconds,
                outcome.attempt_count
            ),
        }
    }
}
