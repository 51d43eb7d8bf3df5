use std::collections::HashSet;
use std::sync::Arc;

use pictionary_core::{Round, RoundEventBus, TracingEventHandler, WordCatalog};
use pictionary_persistence::repositories::SettingsRepository;
use pictionary_types::{DrawingSnapshot, RoundError, RoundOutcome, RoundView};
use tokio::sync::{RwLock, watch};
use tracing::info;

use crate::arbitration::{ArbitrationTiming, RoundHandle};
use crate::recognition::Recognizer;

/// Owns the single round the player is currently drawing.
///
/// A finished round stays current until the next `start_round`, so its
/// outcome can still be read.
pub struct RoundManager {
    catalog: Arc<WordCatalog>,
    recognizer: Arc<dyn Recognizer>,
    settings: SettingsRepository,
    timing: ArbitrationTiming,
    round_duration_seconds: u32,
    current: RwLock<Option<RoundHandle>>,
    /// Live view of whichever round is current, replaced on every start
    rounds: watch::Sender<Option<watch::Receiver<RoundView>>>,
}

impl RoundManager {
    pub fn new(
        catalog: Arc<WordCatalog>,
        recognizer: Arc<dyn Recognizer>,
        settings: SettingsRepository,
        timing: ArbitrationTiming,
        round_duration_seconds: u32,
    ) -> Self {
        Self {
            catalog,
            recognizer,
            settings,
            timing,
            round_duration_seconds,
            current: RwLock::new(None),
            rounds: watch::channel(None).0,
        }
    }

    /// Abandon whatever is running and start a round on a fresh word
    pub async fn start_round(&self) -> Result<RoundView, RoundError> {
        let mut current = self.current.write().await;

        let mut recent_words = self.settings.get_recent_words().await;
        let excluding: HashSet<String> = recent_words.iter().cloned().collect();

        // On failure the previous round, finished or not, stays current
        let word = self
            .catalog
            .select_random(&excluding)
            .map_err(|e| RoundError::WordUnavailable {
                reason: e.to_string(),
            })?;

        if let Some(previous) = current.take() {
            if previous.is_active() {
                info!("Abandoning round {} to start a new one", previous.id());
                // Already finished on its own between the check and the send
                let _ = previous.abandon().await;
            }
        }

        recent_words.push(word.text.clone());
        self.settings.save_recent_words(&recent_words).await;

        let mut events = RoundEventBus::new();
        events.add_handler(Box::new(TracingEventHandler));

        let round = Round::start(word, self.round_duration_seconds);
        let handle = RoundHandle::spawn(round, Arc::clone(&self.recognizer), self.timing, events);
        let view = handle.view();

        info!("Started round {} ({}s)", handle.id(), self.round_duration_seconds);
        self.rounds.send_replace(Some(handle.subscribe()));
        *current = Some(handle);
        Ok(view)
    }

    pub async fn current_round(&self) -> Result<RoundView, RoundError> {
        self.current
            .read()
            .await
            .as_ref()
            .map(RoundHandle::view)
            .ok_or(RoundError::NoActiveRound)
    }

    /// Outcome of the current round once it has ended
    pub async fn current_outcome(&self) -> Option<RoundOutcome> {
        self.current.read().await.as_ref().and_then(RoundHandle::outcome)
    }

    pub async fn submit_drawing(&self, snapshot: DrawingSnapshot) -> Result<(), RoundError> {
        let current = self.current.read().await;
        let handle = current.as_ref().ok_or(RoundError::NoActiveRound)?;
        handle.drawing_updated(snapshot)
    }

    pub async fn abandon_round(&self) -> Result<RoundOutcome, RoundError> {
        let handle = self
            .current
            .read()
            .await
            .clone()
            .ok_or(RoundError::NoActiveRound)?;

        let outcome = handle.abandon().await?;
        info!("Round {} abandoned after {}s", handle.id(), outcome.elapsed_seconds);
        Ok(outcome)
    }

    /// Live view of the current round, if there is one
    pub async fn subscribe(&self) -> Option<watch::Receiver<RoundView>> {
        self.current.read().await.as_ref().map(RoundHandle::subscribe)
    }

    /// Notified each time a new round becomes current
    pub fn watch_rounds(&self) -> watch::Receiver<Option<watch::Receiver<RoundView>>> {
        self.rounds.subscribe()
    }

    pub fn word_count(&self) -> usize {
        self.catalog.word_count()
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }
}
