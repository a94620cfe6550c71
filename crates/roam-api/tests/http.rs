//! End-to-end tests for the REST surface, driving the axum router directly.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use roam_api::{AppStateInner, routes};
use roam_db::Database;
use roam_gateway::dispatcher::{DeliveryScope, Dispatcher};
use roam_gateway::router::MessageRouter;
use roam_types::events::GatewayEvent;

struct Harness {
    app: Router,
    router: MessageRouter,
}

fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let router = MessageRouter::new(db, Dispatcher::new(DeliveryScope::Participants));
    Harness {
        app: routes(AppStateInner::new(router.clone())),
        router,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send(h: &Harness, from: Uuid, to: Uuid, message: &str) -> Value {
    let (status, body) = call(
        &h.app,
        "POST",
        "/messages",
        Some(json!({ "sender_id": from, "receiver_id": to, "message": message })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn inbox_scenario_from_first_message_to_read() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let (status, _) = call(
        &h.app,
        "PUT",
        &format!("/profiles/{}", a),
        Some(json!({ "first_name": "Ana", "avatar": "https://img/ana.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let hi = send(&h, a, b, "hi").await;
    send(&h, b, a, "hello").await;

    let (status, body) = call(
        &h.app,
        "GET",
        &format!("/messages?sender_id={}&receiver_id={}", b, a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["hi", "hello"]);
    assert_eq!(body["match"], Value::Null);

    let (_, inbox) = call(&h.app, "GET", &format!("/chat_users/{}", b), None).await;
    let row = &inbox["data"][0];
    assert_eq!(row["user"]["id"], json!(a));
    assert_eq!(row["user"]["first_name"], "Ana");
    assert_eq!(row["last_message"], "hello");
    assert_eq!(row["unread_count"], 1);

    let (status, marked) = call(
        &h.app,
        "POST",
        "/mark_as_read",
        Some(json!({ "messages": [hi["id"]] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["data"]["updated"], 1);

    let (_, again) = call(
        &h.app,
        "POST",
        "/mark_as_read",
        Some(json!({ "messages": [hi["id"]] })),
    )
    .await;
    assert_eq!(again["data"]["updated"], 0);

    let (_, inbox) = call(&h.app, "GET", &format!("/chat_users/{}", b), None).await;
    assert_eq!(inbox["data"][0]["unread_count"], 0);
}

#[tokio::test]
async fn unknown_pair_is_not_found() {
    let h = harness();
    let (status, body) = call(
        &h.app,
        "GET",
        &format!("/messages?sender_id={}&receiver_id={}", Uuid::new_v4(), Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn self_message_is_a_validation_error() {
    let h = harness();
    let a = Uuid::new_v4();
    let (status, body) = call(
        &h.app,
        "POST",
        "/messages",
        Some(json!({ "sender_id": a, "receiver_id": a, "message": "me" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn http_send_reaches_connected_receiver() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let (_, mut rx) = h.router.dispatcher().register(b).await;

    let stored = send(&h, a, b, "ping").await;

    match rx.recv().await.unwrap() {
        GatewayEvent::ReceiveMessage(msg) => {
            assert_eq!(json!(msg.id), stored["id"]);
            assert_eq!(msg.receiver_id, b);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let h = harness();
    let b = Uuid::new_v4();

    let cases = [
        ("POST", "/mark_as_read".to_string(), Some(json!({ "messages": ["not-a-uuid"] }))),
        (
            "POST",
            "/update_match".to_string(),
            Some(json!({ "user1_id": "x", "user2_id": "y", "clicked_by": "x" })),
        ),
        (
            "POST",
            "/messages".to_string(),
            Some(json!({ "sender_id": "me", "receiver_id": b, "message": "hi" })),
        ),
        ("GET", "/chat_users/not-a-uuid".to_string(), None),
        ("GET", "/messages?sender_id=abc&receiver_id=def".to_string(), None),
        ("PUT", "/profiles/42".to_string(), Some(json!({ "first_name": "Ana" }))),
    ];

    for (method, uri, body) in cases {
        let (status, body) = call(&h.app, method, &uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(body["status"], "error", "{} {}", method, uri);
        assert!(body["data"].is_string(), "{} {}", method, uri);
    }
}

#[tokio::test]
async fn lets_go_protocol() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let pair = json!({ "user1_id": a, "user2_id": b });

    let (status, created) = call(&h.app, "POST", "/create_match", Some(pair.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["created"], true);

    let (status, again) = call(
        &h.app,
        "POST",
        "/create_match",
        Some(json!({ "user1_id": b, "user2_id": a })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["created"], false);
    assert_eq!(again["data"]["match"]["id"], created["data"]["match"]["id"]);

    let (status, clicked) = call(
        &h.app,
        "POST",
        "/update_match",
        Some(json!({ "user1_id": a, "user2_id": b, "clicked_by": a })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clicked["data"]["state"], "one_clicked");

    let (_, both) = call(&h.app, "POST", "/check_both_clicked", Some(pair.clone())).await;
    assert_eq!(both["both_clicked"], false);

    let (_, mine) = call(&h.app, "POST", "/check_letsgo_btn", Some(pair.clone())).await;
    assert_eq!(mine["clicked"], true);
    let (_, theirs) = call(
        &h.app,
        "POST",
        "/check_letsgo_btn",
        Some(json!({ "user1_id": a, "user2_id": b, "asking_user": b })),
    )
    .await;
    assert_eq!(theirs["clicked"], false);

    let (_, done) = call(
        &h.app,
        "POST",
        "/update_match",
        Some(json!({ "user1_id": b, "user2_id": a, "clicked_by": b })),
    )
    .await;
    assert_eq!(done["data"]["state"], "both_clicked");

    let (_, both) = call(&h.app, "POST", "/check_both_clicked", Some(pair)).await;
    assert_eq!(both["both_clicked"], true);
}

#[tokio::test]
async fn match_errors_have_distinct_statuses() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let (status, _) = call(
        &h.app,
        "POST",
        "/update_match",
        Some(json!({ "user1_id": a, "user2_id": b, "clicked_by": a })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(&h.app, "POST", "/create_match", Some(json!({ "user1_id": a, "user2_id": b }))).await;
    let (status, _) = call(
        &h.app,
        "POST",
        "/update_match",
        Some(json!({ "user1_id": a, "user2_id": b, "clicked_by": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn camel_case_request_fields_are_accepted() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let (status, _) = call(
        &h.app,
        "POST",
        "/messages",
        Some(json!({ "senderId": a, "receiverId": b, "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &h.app,
        "GET",
        &format!("/messages?senderId={}&receiverId={}", a, b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let pair = json!({ "user1Id": a, "user2Id": b });
    let (status, _) = call(&h.app, "POST", "/create_match", Some(pair.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, clicked) = call(
        &h.app,
        "POST",
        "/update_match",
        Some(json!({ "user1Id": a, "user2Id": b, "clickedBy": b })),
    )
    .await;
    assert_eq!(clicked["data"]["state"], "one_clicked");

    let (_, theirs) = call(
        &h.app,
        "POST",
        "/check_letsgo_btn",
        Some(json!({ "user1Id": a, "user2Id": b, "askingUser": b })),
    )
    .await;
    assert_eq!(theirs["clicked"], true);

    let (_, both) = call(&h.app, "POST", "/check_both_clicked", Some(pair)).await;
    assert_eq!(both["both_clicked"], false);
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();

    send(&h, a, b, "hi").await;
    send(&h, c, b, "hey").await;
    call(&h.app, "POST", "/create_match", Some(json!({ "user1_id": a, "user2_id": b }))).await;

    let (status, deleted) = call(&h.app, "POST", "/delete", Some(json!({ "id": a }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"]["threads"], 1);
    assert_eq!(deleted["data"]["matches"], 1);

    let (_, inbox) = call(&h.app, "GET", &format!("/chat_users/{}", b), None).await;
    let partners: Vec<Value> = inbox["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["user"]["id"].clone())
        .collect();
    assert_eq!(partners, vec![json!(c)]);

    let (status, _) = call(
        &h.app,
        "POST",
        "/check_both_clicked",
        Some(json!({ "user1_id": a, "user2_id": b })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&h.app, "POST", "/delete", Some(json!({ "id": a }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness();
    let (status, body) = call(&h.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
