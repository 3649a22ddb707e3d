//! Document store seams.
//!
//! Every method is a single atomic operation on the backing store. Lookups
//! return `Option` so "no such document" is never confused with an error.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Chat, Message, User};
use crate::error::AppError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Server-side record of an outstanding refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    /// SHA-256 digest of the token string
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a unique-constraint error when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Replace the profile fields of an existing user. Membership and
    /// `join_date` are not touched.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    /// Returns the updated user, `None` if it does not exist.
    async fn set_current_chat(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
    ) -> Result<Option<User>, AppError>;

    /// Add-to-set semantics.
    async fn add_chat_to_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError>;

    async fn remove_chat_from_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError>;

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_chat(&self, chat: &Chat) -> Result<(), AppError>;

    async fn find_chat(&self, id: Uuid) -> Result<Option<Chat>, AppError>;

    /// Chats with the given ids, in the same order; unknown ids are skipped.
    async fn find_chats(&self, ids: &[Uuid]) -> Result<Vec<Chat>, AppError>;

    async fn rename_chat(&self, id: Uuid, chat_name: &str) -> Result<bool, AppError>;

    /// Add-to-set semantics.
    async fn add_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    async fn remove_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    async fn delete_chat(&self, id: Uuid) -> Result<bool, AppError>;

    /// Append and bump `most_recent_update`. `false` when the chat is unknown.
    async fn push_message(&self, chat_id: Uuid, message: &Message) -> Result<bool, AppError>;

    /// Replace the text and mark the message edited.
    async fn update_message_text(
        &self,
        chat_id: Uuid,
        message_id: Uuid,
        text: &str,
    ) -> Result<bool, AppError>;

    async fn remove_message(&self, chat_id: Uuid, message_id: Uuid) -> Result<bool, AppError>;
}

/// Flat set of outstanding refresh tokens, keyed by token digest.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert-if-absent.
    async fn insert_token(&self, token_hash: &str) -> Result<(), AppError>;

    async fn find_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Delete and return the removed record, `None` if it was not there.
    async fn remove_token(&self, token_hash: &str)
        -> Result<Option<RefreshTokenRecord>, AppError>;

    async fn count_tokens(&self) -> Result<u64, AppError>;
}

/// The three collections the application works with.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub chats: Arc<dyn ChatStore>,
    pub tokens: Arc<dyn RefreshTokenStore>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            users: store.clone(),
            chats: store.clone(),
            tokens: store,
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            chats: store.clone(),
            tokens: store,
        }
    }
}
