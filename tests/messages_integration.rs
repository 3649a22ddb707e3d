mod common;

use common::{spawn_app, Session, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn post_message(app: &TestApp, session: &Session, chat_id: Uuid, text: &str) -> reqwest::Response {
    app.post(
        &format!("/api/chats/{}/messages", chat_id),
        &session.access_token,
        json!({ "text": text }),
    )
    .await
}

async fn message_id(response: reqwest::Response) -> Uuid {
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn members_post_and_read_messages() {
    let app = spawn_app().await;
    let boggs = app.session("boggs").await;
    let tim = app.session("tim").await;
    let chat_id = app.create_chat(&boggs, "Lunch", "tim").await;

    message_id(post_message(&app, &boggs, chat_id, "  where to?  ").await).await;
    message_id(post_message(&app, &tim, chat_id, "tacos").await).await;

    let response = app
        .get(&format!("/api/chats/{}/messages", chat_id), &tim.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "where to?");
    assert_eq!(messages[0]["user"], app.user("boggs").await.id.to_string());
    assert_eq!(messages[1]["edited"], false);

    let chat = app.store.chats.find_chat(chat_id).await.unwrap().unwrap();
    assert!(chat.most_recent_update.is_some());
}

#[tokio::test]
async fn message_text_bounds() {
    let app = spawn_app().await;
    let boggs = app.session("boggs").await;
    let chat_id = app.create_chat(&boggs, "Lunch", "").await;

    let response = post_message(&app, &boggs, chat_id, "   ").await;
    assert_eq!(response.status().as_u16(), 400);

    let response = post_message(&app, &boggs, chat_id, &"a".repeat(901)).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = post_message(&app, &boggs, chat_id, &"a".repeat(900)).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn non_members_cannot_post_or_read() {
    let app = spawn_app().await;
    let boggs = app.session("boggs").await;
    let beth = app.session("beth").await;
    let chat_id = app.create_chat(&boggs, "Lunch", "tim").await;

    let response = post_message(&app, &beth, chat_id, "let me in").await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .get(&format!("/api/chats/{}/messages", chat_id), &beth.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn only_the_author_edits() {
    let app = spawn_app().await;
    let boggs = app.session("boggs").await;
    let tim = app.session("tim").await;
    let chat_id = app.create_chat(&boggs, "Lunch", "tim").await;
    let id = message_id(post_message(&app, &tim, chat_id, "tacos").await).await;
    let path = format!("/api/chats/{}/messages/{}", chat_id, id);

    // same text: accepted, nothing changes
    let response = app.put(&path, &tim.access_token, json!({ "text": "tacos" })).await;
    assert_eq!(response.status().as_u16(), 200);
    let chat = app.store.chats.find_chat(chat_id).await.unwrap().unwrap();
    assert!(!chat.message(id).unwrap().edited);

    let response = app.put(&path, &boggs.access_token, json!({ "text": "pizza" })).await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app.put(&path, &tim.access_token, json!({ "text": "burritos" })).await;
    assert_eq!(response.status().as_u16(), 200);

    let chat = app.store.chats.find_chat(chat_id).await.unwrap().unwrap();
    let message = chat.message(id).unwrap();
    assert_eq!(message.text, "burritos");
    assert!(message.edited);
}

#[tokio::test]
async fn author_or_owner_deletes() {
    let app = spawn_app().await;
    let boggs = app.session("boggs").await;
    let tim = app.session("tim").await;
    let beth = app.session("beth").await;
    let chat_id = app.create_chat(&boggs, "Lunch", "tim,beth").await;

    let first = message_id(post_message(&app, &tim, chat_id, "first").await).await;
    let second = message_id(post_message(&app, &tim, chat_id, "second").await).await;

    let response = app
        .delete(&format!("/api/chats/{}/messages/{}", chat_id, first), &beth.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/api/chats/{}/messages/{}", chat_id, first), &tim.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .delete(&format!("/api/chats/{}/messages/{}", chat_id, second), &boggs.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let chat = app.store.chats.find_chat(chat_id).await.unwrap().unwrap();
    assert!(chat.messages.is_empty());

    let response = app
        .delete(&format!("/api/chats/{}/messages/{}", chat_id, second), &boggs.access_token)
        .await;
    assert_eq!(response.status().as_u16(), 404);
}
