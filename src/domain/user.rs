use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A user account as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub nickname: Option<String>,
    /// Already-encoded image (data URL)
    pub profile_picture: Option<String>,
    pub profile_text: Option<String>,
    pub join_date: DateTime<Utc>,
    /// Chats this user is a member of
    pub chats: Vec<Uuid>,
    pub current_chat: Option<Uuid>,
    pub settings: HashMap<String, String>,
}

impl User {
    pub fn new(username: String, password_hash: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            email,
            nickname: None,
            profile_picture: None,
            profile_text: None,
            join_date: Utc::now(),
            chats: Vec::new(),
            current_chat: None,
            settings: HashMap::new(),
        }
    }

    pub fn is_member_of(&self, chat_id: Uuid) -> bool {
        self.chats.contains(&chat_id)
    }
}

/// What other users may see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub profile_picture: Option<String>,
    pub profile_text: Option<String>,
    pub join_date: DateTime<Utc>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            profile_picture: user.profile_picture.clone(),
            profile_text: user.profile_text.clone(),
            join_date: user.join_date,
        }
    }
}

/// The owner's view of their account: everything except the password hash
/// and the membership list.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub profile_picture: Option<String>,
    pub profile_text: Option<String>,
    pub join_date: DateTime<Utc>,
    pub current_chat: Option<Uuid>,
    pub settings: HashMap<String, String>,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            profile_picture: user.profile_picture.clone(),
            profile_text: user.profile_text.clone(),
            join_date: user.join_date,
            current_chat: user.current_chat,
            settings: user.settings.clone(),
        }
    }
}
