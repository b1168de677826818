mod common;

use axum::http::StatusCode;
use common::create_test_app;
use serde_json::{Value, json};

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_subscribe_and_list() {
    let t = create_test_app().await;
    let alice = t.register("alice", true).await;
    let coach = t.register("coach", false).await;
    let other = t.register("other", false).await;
    let alice_id = t.whoami(&alice).await;
    let coach_id = t.whoami(&coach).await;
    let other_id = t.whoami(&other).await;

    let (_, json) = t.get("/api/trainers/new", Some(&alice)).await;
    assert_eq!(ids(&json["trainers"]), vec![coach_id, other_id]);

    let (status, json) = t
        .post_json(&format!("/api/subscriptions/{}", coach_id), Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["created"], true);

    let (status, json) = t.get("/api/subscriptions", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&json["trainers"]), vec![coach_id]);

    let (_, json) = t.get("/api/trainers/new", Some(&alice)).await;
    assert_eq!(ids(&json["trainers"]), vec![other_id]);

    let (status, json) = t.get("/api/subscriptions/athletes", Some(&coach)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["athletes"], json!([{"id": alice_id, "name": "alice"}]));

    let (_, json) = t.get("/api/subscriptions/athletes", Some(&other)).await;
    assert!(json["athletes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_subscribe_is_idempotent() {
    let t = create_test_app().await;
    let alice = t.register("alice", true).await;
    let coach = t.register("coach", false).await;
    let coach_id = t.whoami(&coach).await;
    let uri = format!("/api/subscriptions/{}", coach_id);

    let (_, first) = t.post_json(&uri, Some(&alice), json!({})).await;
    let (status, second) = t.post_json(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["created"], true);
    assert_eq!(second["created"], false);

    let (_, json) = t.get("/api/subscriptions", Some(&alice)).await;
    assert_eq!(ids(&json["trainers"]), vec![coach_id]);
}

#[tokio::test]
async fn test_subscribe_to_missing_trainer() {
    let t = create_test_app().await;
    let alice = t.register("alice", true).await;

    let (status, json) = t
        .post_json("/api/subscriptions/999", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["result"], "no");
}

#[tokio::test]
async fn test_subscription_roles_enforced() {
    let t = create_test_app().await;
    let alice = t.register("alice", true).await;
    let coach = t.register("coach", false).await;
    let coach_id = t.whoami(&coach).await;

    // Trainers cannot subscribe
    let (status, _) = t
        .post_json(&format!("/api/subscriptions/{}", coach_id), Some(&coach), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Athletes cannot list subscribers
    let (status, _) = t.get("/api/subscriptions/athletes", Some(&alice)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.get("/api/trainers/new", Some(&coach)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
