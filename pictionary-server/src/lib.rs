use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::round_manager::RoundManager;
use pictionary_persistence::repositories::SettingsRepository;
use pictionary_types::{DrawingSnapshot, ErrorResponse, OnboardingStatus, RoundError, WordCount};

pub mod arbitration;
pub mod config;
pub mod rate_limiter;
pub mod recognition;
pub mod round_manager;
pub mod websocket;

/// Upper bound for a drawing upload, rendered image included
const MAX_DRAWING_BYTES: u64 = 8 * 1024 * 1024;

type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

pub fn create_routes(
    round_manager: Arc<RoundManager>,
    settings_repository: Arc<SettingsRepository>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let round_manager_filter = warp::any().map({
        let round_manager = round_manager.clone();
        move || round_manager.clone()
    });

    let settings_filter = warp::any().map({
        let settings_repository = settings_repository.clone();
        move || settings_repository.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(round_manager_filter.clone())
        .map(|ws: warp::ws::Ws, round_manager| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, round_manager))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let onboarding = warp::path!("onboarding")
        .and(warp::get())
        .and(settings_filter.clone())
        .and_then(handle_onboarding_status);

    let complete_onboarding = warp::path!("onboarding" / "complete")
        .and(warp::post())
        .and(settings_filter.clone())
        .and_then(handle_onboarding_complete);

    let word_count = warp::path!("words" / "count")
        .and(warp::get())
        .and(round_manager_filter.clone())
        .map(|round_manager: Arc<RoundManager>| {
            warp::reply::json(&WordCount {
                count: round_manager.word_count(),
            })
        });

    let start_round = warp::path!("rounds")
        .and(warp::post())
        .and(round_manager_filter.clone())
        .and_then(handle_start_round);

    let current_round = warp::path!("rounds" / "current")
        .and(warp::get())
        .and(round_manager_filter.clone())
        .and_then(handle_current_round);

    let submit_drawing = warp::path!("rounds" / "current" / "drawing")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_DRAWING_BYTES))
        .and(warp::body::json())
        .and(round_manager_filter.clone())
        .and_then(handle_submit_drawing);

    let abandon_round = warp::path!("rounds" / "current")
        .and(warp::delete())
        .and(round_manager_filter.clone())
        .and_then(handle_abandon_round);

    let round_outcome = warp::path!("rounds" / "current" / "outcome")
        .and(warp::get())
        .and(round_manager_filter.clone())
        .and_then(handle_round_outcome);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    websocket
        .or(health)
        .or(onboarding)
        .or(complete_onboarding)
        .or(word_count)
        .or(start_round)
        .or(current_round)
        .or(submit_drawing)
        .or(abandon_round)
        .or(round_outcome)
        .with(cors)
        .with(warp::log("air_pictionary"))
}

fn error_reply(error: RoundError) -> JsonReply {
    let status = match error {
        RoundError::NoActiveRound => StatusCode::NOT_FOUND,
        RoundError::RoundAlreadyFinished => StatusCode::CONFLICT,
        RoundError::WordUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };

    warp::reply::with_status(warp::reply::json(&ErrorResponse::new(&error)), status)
}

async fn handle_onboarding_status(
    settings_repository: Arc<SettingsRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let complete = settings_repository.is_onboarding_complete().await;
    Ok(warp::reply::json(&OnboardingStatus { complete }))
}

async fn handle_onboarding_complete(
    settings_repository: Arc<SettingsRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    settings_repository.set_onboarding_complete().await;
    let complete = settings_repository.is_onboarding_complete().await;
    Ok(warp::reply::json(&OnboardingStatus { complete }))
}

async fn handle_start_round(
    round_manager: Arc<RoundManager>,
) -> Result<JsonReply, warp::Rejection> {
    match round_manager.start_round().await {
        Ok(view) => Ok(warp::reply::with_status(
            warp::reply::json(&view),
            StatusCode::CREATED,
        )),
        Err(e) => {
            tracing::error!("Failed to start round: {}", e);
            Ok(error_reply(e))
        }
    }
}

async fn handle_current_round(
    round_manager: Arc<RoundManager>,
) -> Result<JsonReply, warp::Rejection> {
    match round_manager.current_round().await {
        Ok(view) => Ok(warp::reply::with_status(
            warp::reply::json(&view),
            StatusCode::OK,
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_submit_drawing(
    snapshot: DrawingSnapshot,
    round_manager: Arc<RoundManager>,
) -> Result<JsonReply, warp::Rejection> {
    match round_manager.submit_drawing(snapshot).await {
        Ok(()) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({ "accepted": true })),
            StatusCode::ACCEPTED,
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_abandon_round(
    round_manager: Arc<RoundManager>,
) -> Result<JsonReply, warp::Rejection> {
    match round_manager.abandon_round().await {
        Ok(outcome) => Ok(warp::reply::with_status(
            warp::reply::json(&outcome),
            StatusCode::OK,
        )),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_round_outcome(
    round_manager: Arc<RoundManager>,
) -> Result<JsonReply, warp::Rejection> {
    match round_manager.current_outcome().await {
        Some(outcome) => Ok(warp::reply::with_status(
            warp::reply::json(&outcome),
            StatusCode::OK,
        )),
        None => Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new("Round has no outcome yet")),
            StatusCode::NOT_FOUND,
        )),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::arbitration::ArbitrationTiming;
    use crate::recognition::{MockGuesser, RecognitionClient, RecognitionConfig};
    use migration::{Migrator, MigratorTrait};
    use pictionary_core::WordCatalog;
    use pictionary_types::{
        ClientMessage, Difficulty, RoundOutcome, RoundResult, RoundStatus, RoundView,
        ServerMessage, Word,
    };

    async fn create_test_app()
    -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        // Create in-memory database for tests
        let db = pictionary_persistence::connection::connect_to_memory_database()
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();
        let settings_repository = SettingsRepository::new(db);

        let catalog = WordCatalog::new(vec![
            Word::new("CAT", "🐱", Difficulty::Easy),
            Word::new("DOG", "🐶", Difficulty::Easy),
        ]);
        let recognizer = RecognitionClient::with_mock(
            RecognitionConfig::default(),
            MockGuesser::with_seed(3),
        );

        let round_manager = Arc::new(RoundManager::new(
            Arc::new(catalog),
            Arc::new(recognizer),
            settings_repository.clone(),
            ArbitrationTiming::default(),
            120,
        ));

        create_routes(round_manager, Arc::new(settings_repository))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_onboarding_flow() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/onboarding")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let status: OnboardingStatus = serde_json::from_slice(response.body()).unwrap();
        assert!(!status.complete);

        let response = warp::test::request()
            .method("POST")
            .path("/onboarding/complete")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let status: OnboardingStatus = serde_json::from_slice(response.body()).unwrap();
        assert!(status.complete);

        let response = warp::test::request()
            .method("GET")
            .path("/onboarding")
            .reply(&app)
            .await;
        let status: OnboardingStatus = serde_json::from_slice(response.body()).unwrap();
        assert!(status.complete);
    }

    #[tokio::test]
    async fn test_word_count() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/words/count")
            .reply(&app)
            .await;

        let count: WordCount = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(count.count, 2);
    }

    #[tokio::test]
    async fn test_round_endpoints_without_round() {
        let app = create_test_app().await;

        for (method, path) in [
            ("GET", "/rounds/current"),
            ("DELETE", "/rounds/current"),
            ("GET", "/rounds/current/outcome"),
        ] {
            let response = warp::test::request()
                .method(method)
                .path(path)
                .reply(&app)
                .await;
            assert_eq!(response.status(), 404, "{} {}", method, path);
        }

        let response = warp::test::request()
            .method("POST")
            .path("/rounds/current/drawing")
            .json(&DrawingSnapshot::default())
            .reply(&app)
            .await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_round_lifecycle() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path("/rounds")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 201);
        let started: RoundView = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(started.status, RoundStatus::Active);
        assert_eq!(started.duration_seconds, 120);

        let response = warp::test::request()
            .method("GET")
            .path("/rounds/current")
            .reply(&app)
            .await;
        let current: RoundView = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(current.id, started.id);

        let response = warp::test::request()
            .method("POST")
            .path("/rounds/current/drawing")
            .json(&DrawingSnapshot::default())
            .reply(&app)
            .await;
        assert_eq!(response.status(), 202);

        // Round is still running, so there is no outcome
        let response = warp::test::request()
            .method("GET")
            .path("/rounds/current/outcome")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 404);

        let response = warp::test::request()
            .method("DELETE")
            .path("/rounds/current")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let outcome: RoundOutcome = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(outcome.result, RoundResult::Abandoned);
        assert_eq!(outcome.word, started.word);

        let response = warp::test::request()
            .method("GET")
            .path("/rounds/current/outcome")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);

        let response = warp::test::request()
            .method("POST")
            .path("/rounds/current/drawing")
            .json(&DrawingSnapshot::default())
            .reply(&app)
            .await;
        assert_eq!(response.status(), 409);

        let response = warp::test::request()
            .method("DELETE")
            .path("/rounds/current")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 409);
    }

    #[tokio::test]
    async fn test_invalid_drawing_body_is_rejected() {
        let app = create_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path("/rounds/current/drawing")
            .header("content-type", "application/json")
            .body("not json")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
    }

    async fn next_server_message(ws: &mut warp::test::WsClient) -> ServerMessage {
        let msg = ws.recv().await.expect("Should receive a message");
        serde_json::from_str(msg.to_str().expect("Text message")).expect("Valid server message")
    }

    #[tokio::test]
    async fn test_websocket_heartbeat() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        ws.send_text(serde_json::to_string(&ClientMessage::Heartbeat).unwrap())
            .await;

        assert!(matches!(
            next_server_message(&mut ws).await,
            ServerMessage::HeartbeatAck
        ));
    }

    #[tokio::test]
    async fn test_websocket_invalid_message_handling() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        ws.send_text("invalid json").await;

        match next_server_message(&mut ws).await {
            ServerMessage::Error { message } => assert!(message.contains("Invalid JSON")),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_websocket_round_stream() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        ws.send_text(serde_json::to_string(&ClientMessage::StartRound).unwrap())
            .await;

        let round_id = match next_server_message(&mut ws).await {
            ServerMessage::RoundUpdate { round } => {
                assert_eq!(round.status, RoundStatus::Active);
                round.id
            }
            other => panic!("Expected round update, got {:?}", other),
        };

        ws.send_text(serde_json::to_string(&ClientMessage::AbandonRound).unwrap())
            .await;

        // Skip countdown updates until the round ends
        let outcome = loop {
            match next_server_message(&mut ws).await {
                ServerMessage::RoundUpdate { round } => assert_eq!(round.id, round_id),
                ServerMessage::RoundFinished { outcome } => break outcome,
                other => panic!("Unexpected message {:?}", other),
            }
        };
        assert_eq!(outcome.result, RoundResult::Abandoned);
    }

    #[tokio::test]
    async fn test_websocket_drawing_without_round() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app)
            .await
            .expect("WebSocket handshake should succeed");

        let message = ClientMessage::DrawingUpdated {
            snapshot: DrawingSnapshot::default(),
        };
        ws.send_text(serde_json::to_string(&message).unwrap()).await;

        match next_server_message(&mut ws).await {
            ServerMessage::Error { message } => assert_eq!(message, "No round in progress"),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    async fn start_round_over_http<F>(app: &F) -> RoundView
    where
        F: Filter + 'static,
        F::Extract: warp::Reply + Send,
    {
        let response = warp::test::request()
            .method("POST")
            .path("/rounds")
            .reply(app)
            .await;
        assert_eq!(response.status(), 201);
        serde_json::from_slice(response.body()).unwrap()
    }

    /// Next message that is not a countdown update for `skip`
    async fn next_message_skipping(
        ws: &mut warp::test::WsClient,
        skip: uuid::Uuid,
    ) -> ServerMessage {
        loop {
            let message = tokio::time::timeout(
                std::time::Duration::from_secs(3),
                next_server_message(ws),
            )
            .await
            .expect("Should receive a message within 3s");

            match &message {
                ServerMessage::RoundUpdate { round } if round.id == skip => continue,
                _ => return message,
            }
        }
    }

    #[tokio::test]
    async fn test_websocket_follows_round_started_over_http() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app.clone())
            .await
            .expect("WebSocket handshake should succeed");

        let started = start_round_over_http(&app).await;

        match next_message_skipping(&mut ws, uuid::Uuid::nil()).await {
            ServerMessage::RoundUpdate { round } => {
                assert_eq!(round.id, started.id);
                assert_eq!(round.status, RoundStatus::Active);
            }
            other => panic!("Expected round update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_websocket_follows_next_round_after_finish() {
        let app = create_test_app().await;

        let mut ws = warp::test::ws()
            .path("/ws")
            .handshake(app.clone())
            .await
            .expect("WebSocket handshake should succeed");

        let first = start_round_over_http(&app).await;
        ws.send_text(serde_json::to_string(&ClientMessage::AbandonRound).unwrap())
            .await;

        match next_message_skipping(&mut ws, first.id).await {
            ServerMessage::RoundFinished { outcome } => {
                assert_eq!(outcome.result, RoundResult::Abandoned)
            }
            other => panic!("Expected round finished, got {:?}", other),
        }

        let second = start_round_over_http(&app).await;

        match next_message_skipping(&mut ws, first.id).await {
            ServerMessage::RoundUpdate { round } => assert_eq!(round.id, second.id),
            other => panic!("Expected update for the new round, got {:?}", other),
        }
    }
}
