use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    /// Author
    pub user: Uuid,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub edited: bool,
}

impl Message {
    pub fn new(user: Uuid, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            timestamp: Utc::now(),
            text,
            edited: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: Uuid,
    pub chat_name: String,
    pub chat_owner: Uuid,
    pub start_date: DateTime<Utc>,
    pub users: Vec<Uuid>,
    pub messages: Vec<Message>,
    pub most_recent_update: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn new(chat_name: String, chat_owner: Uuid, users: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            chat_name,
            chat_owner,
            start_date: now,
            users,
            messages: Vec::new(),
            most_recent_update: Some(now),
        }
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.chat_owner == user_id
    }

    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.users.contains(&user_id)
    }

    pub fn message(&self, message_id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// Listing entry for a user's chats.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub chat_name: String,
    pub chat_owner: Uuid,
    pub users: Vec<Uuid>,
}

impl From<&Chat> for ChatSummary {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id,
            chat_name: chat.chat_name.clone(),
            chat_owner: chat.chat_owner,
            users: chat.users.clone(),
        }
    }
}
