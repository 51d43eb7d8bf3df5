use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::rate_limiter::RateLimiter;
use crate::round_manager::RoundManager;
use pictionary_types::{ClientMessage, RoundView, ServerMessage};

pub async fn handle_connection(websocket: WebSocket, round_manager: Arc<RoundManager>) {
    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut session = Session::new(connection_id, round_manager, outgoing_tx);

    // Handle incoming messages
    let incoming_handler = async move {
        let mut rate_limiter = RateLimiter::new();

        while let Some(result) = ws_receiver.next().await {
            let msg = match result {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            };

            if msg.is_close() {
                break;
            }
            if !msg.is_text() {
                continue;
            }

            if !rate_limiter.check_rate_limit().await {
                warn!("Rate limit exceeded for connection {}", connection_id);
                session.send_error("Rate limit exceeded");
                continue;
            }

            let text = match msg.to_str() {
                Ok(text) => text,
                Err(_) => continue,
            };

            match serde_json::from_str::<ClientMessage>(text) {
                Ok(client_message) => session.handle_message(client_message).await,
                Err(e) => session.send_error(format!("Invalid JSON message: {}", e)),
            }
        }
    };

    // Handle outgoing messages
    let outgoing_handler = async move {
        while let Some(message) = outgoing_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    // Run both handlers concurrently
    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
}

/// Per-connection state: where replies go and which round is being
/// streamed to the client.
struct Session {
    connection_id: Uuid,
    round_manager: Arc<RoundManager>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
    forwarder: Option<JoinHandle<()>>,
}

impl Session {
    fn new(
        connection_id: Uuid,
        round_manager: Arc<RoundManager>,
        outgoing: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let forwarder = tokio::spawn(forward_rounds(
            connection_id,
            round_manager.watch_rounds(),
            outgoing.clone(),
        ));

        Self {
            connection_id,
            round_manager,
            outgoing,
            forwarder: Some(forwarder),
        }
    }

    async fn handle_message(&mut self, message: ClientMessage) {
        match message {
            // The forwarder picks up the new round
            ClientMessage::StartRound => {
                if let Err(e) = self.round_manager.start_round().await {
                    self.send_error(e);
                }
            }
            ClientMessage::DrawingUpdated { snapshot } => {
                if let Err(e) = self.round_manager.submit_drawing(snapshot).await {
                    self.send_error(e);
                }
            }
            ClientMessage::AbandonRound => {
                // The forwarder reports the abandoned outcome
                if let Err(e) = self.round_manager.abandon_round().await {
                    self.send_error(e);
                }
            }
            ClientMessage::Heartbeat => self.send(ServerMessage::HeartbeatAck),
        }
    }

    fn stop_forwarding(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }

    fn send(&self, message: ServerMessage) {
        if self.outgoing.send(message).is_err() {
            tracing::debug!("Dropping message for closed connection {}", self.connection_id);
        }
    }

    fn send_error(&self, message: impl ToString) {
        self.send(ServerMessage::Error {
            message: message.to_string(),
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_forwarding();
    }
}

/// Stream whichever round is current, switching when a new one starts
async fn forward_rounds(
    connection_id: Uuid,
    mut rounds: watch::Receiver<Option<watch::Receiver<RoundView>>>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let current = rounds.borrow_and_update().clone();

        if let Some(view) = current {
            tracing::debug!("Connection {} following round {}", connection_id, view.borrow().id);

            tokio::select! {
                // Finish reporting the old round before moving to the next one
                biased;

                delivered = forward_round_updates(view, outgoing.clone()) => {
                    if !delivered {
                        return;
                    }
                    if rounds.changed().await.is_err() {
                        return;
                    }
                }
                changed = rounds.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        } else if rounds.changed().await.is_err() {
            return;
        }
    }
}

/// Push every published state of one round, then its outcome. Returns
/// false once the connection is gone.
async fn forward_round_updates(
    mut view: watch::Receiver<RoundView>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
) -> bool {
    loop {
        let round = view.borrow_and_update().clone();
        let outcome = round.outcome.clone();

        if outgoing.send(ServerMessage::RoundUpdate { round }).is_err() {
            return false;
        }
        if let Some(outcome) = outcome {
            return outgoing.send(ServerMessage::RoundFinished { outcome }).is_ok();
        }
        if view.changed().await.is_err() {
            return true;
        }
    }
}
