//! The same expectations run against the in-memory store and a fresh
//! Postgres database. The Postgres cases need the server described in
//! `configuration.yaml`.

mod common;

use chatroom::auth::hash_token;
use chatroom::domain::{Chat, Message, User};
use chatroom::error::{AppError, DatabaseError};
use chatroom::store::Store;
use common::{cookie_header, fresh_database, refresh_cookie, spawn_postgres_app};
use serde_json::{json, Value};

async fn postgres_store() -> Store {
    Store::postgres(fresh_database().await)
}

async fn seeded_user(store: &Store, name: &str) -> User {
    let user = User::new(
        name.to_string(),
        "hash".to_string(),
        format!("{}@example.com", name),
    );
    store.users.insert_user(&user).await.unwrap();
    user
}

/// Create a chat the way the handlers do: the chat document plus each
/// member's membership entry.
async fn seeded_chat(store: &Store, name: &str, owner: &User, members: &[&User]) -> Chat {
    let mut users = vec![owner.id];
    users.extend(members.iter().map(|u| u.id));
    let chat = Chat::new(name.to_string(), owner.id, users.clone());
    store.chats.insert_chat(&chat).await.unwrap();
    for user_id in users {
        store.users.add_chat_to_user(user_id, chat.id).await.unwrap();
    }
    chat
}

async fn token_lifecycle(store: Store) {
    let digest = hash_token("header.payload.signature");
    assert_eq!(store.tokens.count_tokens().await.unwrap(), 0);
    assert!(store.tokens.find_token(&digest).await.unwrap().is_none());

    store.tokens.insert_token(&digest).await.unwrap();
    store.tokens.insert_token(&digest).await.unwrap();
    assert_eq!(store.tokens.count_tokens().await.unwrap(), 1);

    let record = store.tokens.find_token(&digest).await.unwrap().unwrap();
    assert_eq!(record.token_hash, digest);

    let removed = store.tokens.remove_token(&digest).await.unwrap().unwrap();
    assert_eq!(removed.token_hash, digest);
    assert!(store.tokens.remove_token(&digest).await.unwrap().is_none());
    assert_eq!(store.tokens.count_tokens().await.unwrap(), 0);
}

async fn duplicate_username(store: Store) {
    seeded_user(&store, "boggs").await;

    let again = User::new(
        "boggs".to_string(),
        "hash".to_string(),
        "other@example.com".to_string(),
    );
    let result = store.users.insert_user(&again).await;
    assert!(matches!(
        result,
        Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
    ));
}

async fn membership_is_visible_from_both_sides(store: Store) {
    let boggs = seeded_user(&store, "boggs").await;
    let tim = seeded_user(&store, "tim").await;
    let chat = seeded_chat(&store, "Lunch", &boggs, &[&tim]).await;

    // adding twice changes nothing
    store.users.add_chat_to_user(tim.id, chat.id).await.unwrap();
    store.chats.add_member(chat.id, tim.id).await.unwrap();

    let stored = store.chats.find_chat(chat.id).await.unwrap().unwrap();
    assert_eq!(stored.users.len(), 2);
    assert!(stored.has_member(boggs.id) && stored.has_member(tim.id));
    let tim_now = store.users.find_user(tim.id).await.unwrap().unwrap();
    assert_eq!(tim_now.chats, vec![chat.id]);

    store.chats.remove_member(chat.id, tim.id).await.unwrap();
    store.users.remove_chat_from_user(tim.id, chat.id).await.unwrap();

    let stored = store.chats.find_chat(chat.id).await.unwrap().unwrap();
    assert_eq!(stored.users, vec![boggs.id]);
    assert!(store.users.find_user(tim.id).await.unwrap().unwrap().chats.is_empty());
}

async fn leaving_current_chat_clears_it(store: Store) {
    let boggs = seeded_user(&store, "boggs").await;
    let chat = seeded_chat(&store, "Lunch", &boggs, &[]).await;

    let updated = store
        .users
        .set_current_chat(boggs.id, Some(chat.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.current_chat, Some(chat.id));

    store.users.remove_chat_from_user(boggs.id, chat.id).await.unwrap();

    let stored = store.users.find_user(boggs.id).await.unwrap().unwrap();
    assert_eq!(stored.current_chat, None);
    assert!(store
        .users
        .set_current_chat(uuid::Uuid::new_v4(), None)
        .await
        .unwrap()
        .is_none());
}

async fn profile_update_keeps_membership(store: Store) {
    let boggs = seeded_user(&store, "boggs").await;
    let chat = seeded_chat(&store, "Lunch", &boggs, &[]).await;

    let mut changed = store.users.find_user(boggs.id).await.unwrap().unwrap();
    changed.username = "boggs2".to_string();
    changed.nickname = Some("Bogsy".to_string());
    changed.settings.insert("theme".to_string(), "dark".to_string());
    store.users.update_user(&changed).await.unwrap();

    let stored = store
        .users
        .find_user_by_username("boggs2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.nickname.as_deref(), Some("Bogsy"));
    assert_eq!(stored.settings.get("theme").map(String::as_str), Some("dark"));
    assert_eq!(stored.chats, vec![chat.id]);
    assert!(store.users.find_user_by_username("boggs").await.unwrap().is_none());
}

async fn messages_append_edit_and_remove(store: Store) {
    let boggs = seeded_user(&store, "boggs").await;
    let chat = seeded_chat(&store, "Lunch", &boggs, &[]).await;
    let first = Message::new(boggs.id, "first".to_string());
    let second = Message::new(boggs.id, "second".to_string());

    assert!(store.chats.push_message(chat.id, &first).await.unwrap());
    assert!(store.chats.push_message(chat.id, &second).await.unwrap());
    assert!(!store
        .chats
        .push_message(uuid::Uuid::new_v4(), &first)
        .await
        .unwrap());

    assert!(store
        .chats
        .update_message_text(chat.id, first.id, "first, edited")
        .await
        .unwrap());
    assert!(store.chats.remove_message(chat.id, second.id).await.unwrap());
    assert!(!store.chats.remove_message(chat.id, second.id).await.unwrap());

    let stored = store.chats.find_chat(chat.id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].text, "first, edited");
    assert!(stored.messages[0].edited);
    assert!(stored.most_recent_update.is_some());
}

async fn deleting_chat_and_user(store: Store) {
    let boggs = seeded_user(&store, "boggs").await;
    let tim = seeded_user(&store, "tim").await;
    let owned = seeded_chat(&store, "owned", &boggs, &[&tim]).await;
    let other = seeded_chat(&store, "other", &tim, &[]).await;

    assert!(store.chats.rename_chat(owned.id, "renamed").await.unwrap());
    let found = store.chats.find_chats(&[other.id, owned.id]).await.unwrap();
    let names: Vec<&str> = found.iter().map(|c| c.chat_name.as_str()).collect();
    assert_eq!(names, vec!["other", "renamed"]);

    assert!(store.chats.delete_chat(owned.id).await.unwrap());
    assert!(!store.chats.delete_chat(owned.id).await.unwrap());
    store.users.remove_chat_from_user(tim.id, owned.id).await.unwrap();
    store.users.remove_chat_from_user(boggs.id, owned.id).await.unwrap();
    assert!(store.chats.find_chat(owned.id).await.unwrap().is_none());

    assert!(store.users.delete_user(boggs.id).await.unwrap());
    assert!(!store.users.delete_user(boggs.id).await.unwrap());
    let remaining = store.users.list_users().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].chats, vec![other.id]);
}

#[tokio::test]
async fn memory_token_lifecycle() {
    token_lifecycle(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_token_lifecycle() {
    token_lifecycle(postgres_store().await).await;
}

#[tokio::test]
async fn memory_duplicate_username() {
    duplicate_username(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_duplicate_username() {
    duplicate_username(postgres_store().await).await;
}

#[tokio::test]
async fn memory_membership_is_visible_from_both_sides() {
    membership_is_visible_from_both_sides(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_membership_is_visible_from_both_sides() {
    membership_is_visible_from_both_sides(postgres_store().await).await;
}

#[tokio::test]
async fn memory_leaving_current_chat_clears_it() {
    leaving_current_chat_clears_it(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_leaving_current_chat_clears_it() {
    leaving_current_chat_clears_it(postgres_store().await).await;
}

#[tokio::test]
async fn memory_profile_update_keeps_membership() {
    profile_update_keeps_membership(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_profile_update_keeps_membership() {
    profile_update_keeps_membership(postgres_store().await).await;
}

#[tokio::test]
async fn memory_messages_append_edit_and_remove() {
    messages_append_edit_and_remove(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_messages_append_edit_and_remove() {
    messages_append_edit_and_remove(postgres_store().await).await;
}

#[tokio::test]
async fn memory_deleting_chat_and_user() {
    deleting_chat_and_user(Store::in_memory()).await;
}

#[tokio::test]
async fn postgres_deleting_chat_and_user() {
    deleting_chat_and_user(postgres_store().await).await;
}

#[tokio::test]
async fn postgres_session_lifecycle_end_to_end() {
    let app = spawn_postgres_app().await;
    let session = app.session("boggs").await;
    assert_eq!(app.token_count().await, 1);

    let response = app
        .client
        .put(app.url("/api/users/boggs/account"))
        .bearer_auth(&session.access_token)
        .header("Cookie", cookie_header(&session.refresh_token))
        .json(&json!({ "nickname": "Bogsy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let rotated = refresh_cookie(&response).expect("No rotated cookie");
    assert!(!app.authenticator.is_stored(&session.refresh_token).await.unwrap());
    assert_eq!(app.token_count().await, 1);

    let response = app
        .client
        .get(app.url("/api/auth/token"))
        .header("Cookie", cookie_header(&rotated))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["access_token"].is_string());

    let response = app
        .client
        .get(app.url("/api/auth/logout"))
        .header("Cookie", cookie_header(&rotated))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.token_count().await, 0);
}
