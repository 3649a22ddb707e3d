//! In-memory store for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChatStore, RefreshTokenRecord, RefreshTokenStore, UserStore};
use crate::domain::{Chat, Message, User};
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    chats: RwLock<HashMap<Uuid, Chat>>,
    /// token digest → record
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "username {} already exists",
                user.username
            ))
            .into());
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.join_date.cmp(&b.join_date));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "username {} already exists",
                user.username
            ))
            .into());
        }
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found("user"))?;

        stored.username = user.username.clone();
        stored.password_hash = user.password_hash.clone();
        stored.email = user.email.clone();
        stored.nickname = user.nickname.clone();
        stored.profile_picture = user.profile_picture.clone();
        stored.profile_text = user.profile_text.clone();
        stored.current_chat = user.current_chat;
        stored.settings = user.settings.clone();
        Ok(())
    }

    async fn set_current_chat(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&user_id).map(|user| {
            user.current_chat = chat_id;
            user.clone()
        }))
    }

    async fn add_chat_to_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            if !user.chats.contains(&chat_id) {
                user.chats.push(chat_id);
            }
        }
        Ok(())
    }

    async fn remove_chat_from_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.chats.retain(|id| *id != chat_id);
            if user.current_chat == Some(chat_id) {
                user.current_chat = None;
            }
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_chat(&self, chat: &Chat) -> Result<(), AppError> {
        self.chats.write().await.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn find_chat(&self, id: Uuid) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn find_chats(&self, ids: &[Uuid]) -> Result<Vec<Chat>, AppError> {
        let chats = self.chats.read().await;
        Ok(ids.iter().filter_map(|id| chats.get(id).cloned()).collect())
    }

    async fn rename_chat(&self, id: Uuid, chat_name: &str) -> Result<bool, AppError> {
        Ok(match self.chats.write().await.get_mut(&id) {
            Some(chat) => {
                chat.chat_name = chat_name.to_string();
                true
            }
            None => false,
        })
    }

    async fn add_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if let Some(chat) = self.chats.write().await.get_mut(&chat_id) {
            if !chat.users.contains(&user_id) {
                chat.users.push(user_id);
            }
        }
        Ok(())
    }

    async fn remove_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if let Some(chat) = self.chats.write().await.get_mut(&chat_id) {
            chat.users.retain(|id| *id != user_id);
        }
        Ok(())
    }

    async fn delete_chat(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.chats.write().await.remove(&id).is_some())
    }

    async fn push_message(&self, chat_id: Uuid, message: &Message) -> Result<bool, AppError> {
        Ok(match self.chats.write().await.get_mut(&chat_id) {
            Some(chat) => {
                chat.messages.push(message.clone());
                chat.most_recent_update = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn update_message_text(
        &self,
        chat_id: Uuid,
        message_id: Uuid,
        text: &str,
    ) -> Result<bool, AppError> {
        let mut chats = self.chats.write().await;
        let message = chats
            .get_mut(&chat_id)
            .and_then(|chat| chat.messages.iter_mut().find(|m| m.id == message_id));
        Ok(match message {
            Some(message) => {
                message.text = text.to_string();
                message.edited = true;
                true
            }
            None => false,
        })
    }

    async fn remove_message(&self, chat_id: Uuid, message_id: Uuid) -> Result<bool, AppError> {
        Ok(match self.chats.write().await.get_mut(&chat_id) {
            Some(chat) => {
                let before = chat.messages.len();
                chat.messages.retain(|m| m.id != message_id);
                chat.messages.len() != before
            }
            None => false,
        })
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert_token(&self, token_hash: &str) -> Result<(), AppError> {
        self.tokens
            .write()
            .await
            .entry(token_hash.to_string())
            .or_insert_with(|| RefreshTokenRecord {
                token_hash: token_hash.to_string(),
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }

    async fn remove_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.tokens.write().await.remove(token_hash))
    }

    async fn count_tokens(&self) -> Result<u64, AppError> {
        Ok(self.tokens.read().await.len() as u64)
    }
}
