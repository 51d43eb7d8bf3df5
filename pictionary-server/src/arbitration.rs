use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, OptionFuture};
use pictionary_core::{Round, RoundEvent, RoundEventBus};
use pictionary_types::{
    DrawingSnapshot, Recognition, RoundError, RoundId, RoundOutcome, RoundView,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

use crate::recognition::Recognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrationTiming {
    /// Countdown step, one round second per tick
    pub tick_interval: Duration,
    /// Quiet period after the last drawing update before recognition runs
    pub debounce_window: Duration,
}

impl Default for ArbitrationTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            debounce_window: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
enum RoundCommand {
    DrawingUpdated(DrawingSnapshot),
    Abandon(oneshot::Sender<Option<RoundOutcome>>),
}

/// Caller's side of a running round.
///
/// Dropping the last handle abandons the round.
#[derive(Debug, Clone)]
pub struct RoundHandle {
    id: RoundId,
    commands: mpsc::UnboundedSender<RoundCommand>,
    view: watch::Receiver<RoundView>,
}

impl RoundHandle {
    /// Start the countdown for `round` on its own task
    pub fn spawn(
        round: Round,
        recognizer: Arc<dyn Recognizer>,
        timing: ArbitrationTiming,
        events: RoundEventBus,
    ) -> Self {
        let id = round.id;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(round.view());

        let arbiter = Arbiter {
            round,
            recognizer,
            timing,
            commands: command_rx,
            view: view_tx,
            events,
        };
        tokio::spawn(arbiter.run());

        Self {
            id,
            commands: command_tx,
            view: view_rx,
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn view(&self) -> RoundView {
        self.view.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.view.borrow().status.is_terminal()
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.view.borrow().outcome.clone()
    }

    /// Receiver that sees every published round state
    pub fn subscribe(&self) -> watch::Receiver<RoundView> {
        self.view.clone()
    }

    /// Report a drawing change; restarts the debounce window
    pub fn drawing_updated(&self, snapshot: DrawingSnapshot) -> Result<(), RoundError> {
        if !self.is_active() {
            return Err(RoundError::RoundAlreadyFinished);
        }
        self.commands
            .send(RoundCommand::DrawingUpdated(snapshot))
            .map_err(|_| RoundError::RoundAlreadyFinished)
    }

    /// End the round at the player's request
    pub async fn abandon(&self) -> Result<RoundOutcome, RoundError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(RoundCommand::Abandon(reply_tx))
            .map_err(|_| RoundError::RoundAlreadyFinished)?;

        reply_rx
            .await
            .ok()
            .flatten()
            .ok_or(RoundError::RoundAlreadyFinished)
    }

    /// Resolves once the round has left `Active`
    pub async fn wait_for_outcome(&self) -> Option<RoundOutcome> {
        let mut view = self.view.clone();
        loop {
            if let Some(outcome) = view.borrow_and_update().outcome.clone() {
                return Some(outcome);
            }
            if view.changed().await.is_err() {
                return view.borrow().outcome.clone();
            }
        }
    }
}

/// Owns the round while it is active. All mutation happens on this task.
struct Arbiter {
    round: Round,
    recognizer: Arc<dyn Recognizer>,
    timing: ArbitrationTiming,
    commands: mpsc::UnboundedReceiver<RoundCommand>,
    view: watch::Sender<RoundView>,
    events: RoundEventBus,
}

impl Arbiter {
    async fn run(mut self) {
        self.events.publish(RoundEvent::RoundStarted {
            round_id: self.round.id,
            word: self.round.word.text.clone(),
            duration_seconds: self.round.duration_seconds,
        });

        let tick = self.timing.tick_interval;
        let mut countdown = time::interval_at(Instant::now() + tick, tick);

        let debounce = time::sleep(self.timing.debounce_window);
        tokio::pin!(debounce);
        let mut debounce_armed = false;
        let mut pending_snapshot: Option<DrawingSnapshot> = None;

        let mut in_flight: Option<BoxFuture<'static, Recognition>> = None;

        let outcome = loop {
            tokio::select! {
                // Responses are handled before ticks so a correct guess
                // landing on the last second still wins.
                biased;

                Some(recognition) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    if let Some(outcome) = self.apply_recognition(recognition) {
                        break outcome;
                    }
                }
                _ = countdown.tick() => {
                    if let Some(outcome) = self.round.tick() {
                        break outcome;
                    }
                    self.publish_view();
                }
                command = self.commands.recv() => match command {
                    Some(RoundCommand::DrawingUpdated(snapshot)) => {
                        pending_snapshot = Some(snapshot);
                        debounce.as_mut().reset(Instant::now() + self.timing.debounce_window);
                        debounce_armed = true;
                    }
                    Some(RoundCommand::Abandon(reply)) => {
                        let outcome = self.round.abandon();
                        // Callers reading the view after the reply see the final state
                        self.publish_view();
                        let _ = reply.send(outcome.clone());
                        if let Some(outcome) = outcome {
                            break outcome;
                        }
                    }
                    None => {
                        tracing::debug!("All handles for round {} dropped", self.round.id);
                        if let Some(outcome) = self.round.abandon() {
                            break outcome;
                        }
                    }
                },
                _ = &mut debounce, if debounce_armed => {
                    debounce_armed = false;
                    if let Some(snapshot) = pending_snapshot.take() {
                        if in_flight.is_some() {
                            tracing::debug!("Cancelling in-flight recognition for round {}", self.round.id);
                        }
                        in_flight = Some(self.request_recognition(snapshot));
                    }
                }
            }
        };

        // Stop the countdown and cancel any in-flight request before
        // reporting, so nothing reaches the round after this point
        drop(in_flight);
        drop(countdown);
        self.finish(outcome);
    }

    fn request_recognition(&self, snapshot: DrawingSnapshot) -> BoxFuture<'static, Recognition> {
        let recognizer = Arc::clone(&self.recognizer);
        let target = self.round.word.text.clone();
        tracing::debug!(
            "Requesting recognition for round {} ({} points)",
            self.round.id,
            snapshot.point_count()
        );

        Box::pin(async move { recognizer.recognize(&snapshot, &target).await })
    }

    fn apply_recognition(&mut self, recognition: Recognition) -> Option<RoundOutcome> {
        if recognition.is_empty() {
            tracing::debug!("No new guesses for round {}", self.round.id);
            return None;
        }

        let outcome = self.round.record(&recognition);

        let new_count = recognition.guesses.len().min(pictionary_types::GUESS_HISTORY_LIMIT);
        let history: Vec<_> = self.round.guess_history().cloned().collect();
        let guesses = history[history.len().saturating_sub(new_count)..].to_vec();
        self.events.publish(RoundEvent::GuessesReceived {
            round_id: self.round.id,
            guesses,
        });

        if outcome.is_none() {
            self.publish_view();
        }
        outcome
    }

    fn publish_view(&self) {
        self.view.send_replace(self.round.view());
    }

    fn finish(mut self, outcome: RoundOutcome) {
        self.publish_view();
        self.events.publish(RoundEvent::finished(self.round.id, outcome));
    }
}
