use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use dost::{
    AskRequest, BackendError, ChatBackend, ChatController, HttpBackend, MemoryStore, MoodTier,
    PreferenceStore, Sender, Widgets, FALLBACK_REPLY, LOCATION_KEY,
};
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<Value>>>;

/// Serves `reply` with `status` on /api/ask and records every body it receives.
async fn serve(status: StatusCode, reply: &'static str) -> (String, Seen) {
    let seen: Seen = Arc::default();

    let app = Router::new()
        .route(
            "/api/ask",
            post(move |State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                (status, [("content-type", "application/json")], reply)
            }),
        )
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), seen)
}

fn request(message: &str) -> AskRequest {
    AskRequest {
        message: message.to_string(),
        location: None,
        consent: false,
    }
}

#[tokio::test]
async fn posts_message_location_and_consent() {
    let (url, seen) = serve(StatusCode::OK, r#"{"response":"hello"}"#).await;
    let backend = HttpBackend::new(&url);

    let reply = backend
        .ask(&AskRequest {
            message: "hi".to_string(),
            location: Some("Paris".to_string()),
            consent: true,
        })
        .await
        .unwrap();

    assert_eq!(reply.response, "hello");
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[json!({ "message": "hi", "location": "Paris", "consent": true })]
    );
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (url, _) = serve(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"response":"I'm having a little trouble thinking right now.","mood":"neutral","is_crisis":false}"#,
    )
    .await;

    let err = HttpBackend::new(&url).ask(&request("hi")).await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 500 }));
}

#[tokio::test]
async fn body_without_response_is_a_decode_error() {
    let (url, _) = serve(StatusCode::OK, r#"{"mood":"happy"}"#).await;

    let err = HttpBackend::new(&url).ask(&request("hi")).await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Bind then drop so the port is very likely closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpBackend::new(&format!("http://{}", addr))
        .ask(&request("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}

#[tokio::test]
async fn controller_renders_crisis_reply_end_to_end() {
    let (url, seen) = serve(
        StatusCode::OK,
        r#"{"response":"It sounds like you are in serious distress.","is_crisis":true,"helpline":"Tele-MANAS: 14416","mood":"sad"}"#,
    )
    .await;

    let mut store = MemoryStore::new();
    store.set(LOCATION_KEY, "Pune").unwrap();
    let mut controller = ChatController::new(
        Arc::new(HttpBackend::new(&url)),
        Box::new(store),
        Widgets::all(Vec::new()),
    );

    controller.send_message(Some("I want to die")).await;

    let last = controller.transcript().messages().last().unwrap();
    assert_eq!(last.sender, Sender::Bot);
    assert_eq!(last.text, "It sounds like you are in serious distress.");
    assert_eq!(
        controller.crisis().and_then(|a| a.helpline.as_deref()),
        Some("Tele-MANAS: 14416")
    );
    assert_eq!(
        controller.mood_gauge().and_then(|g| g.tier()),
        Some(MoodTier::Negative)
    );
    assert_eq!(seen.lock().unwrap()[0]["location"], json!("Pune"));
}

#[tokio::test]
async fn controller_shows_fallback_when_backend_fails() {
    let (url, _) = serve(StatusCode::BAD_GATEWAY, "upstream down").await;
    let mut controller = ChatController::new(
        Arc::new(HttpBackend::new(&url)),
        Box::new(MemoryStore::new()),
        Widgets::default(),
    );

    controller.send_message(Some("hello")).await;

    let bot: Vec<_> = controller
        .transcript()
        .messages()
        .filter(|m| m.sender == Sender::Bot)
        .collect();
    assert_eq!(bot.len(), 1);
    assert_eq!(bot[0].text, FALLBACK_REPLY);
    assert_eq!(controller.transcript().typing_count(), 0);
}
