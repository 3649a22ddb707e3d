//! Postgres-backed store.
//!
//! Documents are normalised into `users`, `chats`, `chat_members` and
//! `messages`; a user's `chats` list and a chat's `users` list are both
//! read from `chat_members`, so the two sides can never disagree.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ChatStore, RefreshTokenRecord, RefreshTokenStore, UserStore};
use crate::domain::{Chat, Message, User};
use crate::error::{AppError, DatabaseError};

pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    email: String,
    nickname: Option<String>,
    profile_picture: Option<String>,
    profile_text: Option<String>,
    join_date: DateTime<Utc>,
    current_chat: Option<Uuid>,
    settings: Json<HashMap<String, String>>,
}

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    chat_name: String,
    chat_owner: Uuid,
    start_date: DateTime<Utc>,
    most_recent_update: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    user_id: Uuid,
    sent_at: DateTime<Utc>,
    text: String,
    edited: bool,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            user: row.user_id,
            timestamp: row.sent_at,
            text: row.text,
            edited: row.edited,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token_hash: String,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for RefreshTokenRecord {
    fn from(row: TokenRow) -> Self {
        RefreshTokenRecord {
            token_hash: row.token_hash,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, email, nickname, profile_picture, \
                            profile_text, join_date, current_chat, settings";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::UnexpectedError(e.to_string())))
    }

    async fn hydrate_user(&self, row: UserRow) -> Result<User, AppError> {
        let chats = sqlx::query_scalar::<_, Uuid>(
            "SELECT chat_id FROM chat_members WHERE user_id = $1 ORDER BY joined_at",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            nickname: row.nickname,
            profile_picture: row.profile_picture,
            profile_text: row.profile_text,
            join_date: row.join_date,
            chats,
            current_chat: row.current_chat,
            settings: row.settings.0,
        })
    }

    async fn hydrate_chat(&self, row: ChatRow) -> Result<Chat, AppError> {
        let users = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM chat_members WHERE chat_id = $1 ORDER BY joined_at",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let messages = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, user_id, sent_at, text, edited
            FROM messages
            WHERE chat_id = $1
            ORDER BY sent_at
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Message::from)
        .collect();

        Ok(Chat {
            id: row.id,
            chat_name: row.chat_name,
            chat_owner: row.chat_owner,
            start_date: row.start_date,
            users,
            messages,
            most_recent_update: row.most_recent_update,
        })
    }

    async fn add_membership(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, email, nickname, profile_picture,
                               profile_text, join_date, current_chat, settings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.profile_picture)
        .bind(&user.profile_text)
        .bind(user.join_date)
        .bind(user.current_chat)
        .bind(Json(&user.settings))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY join_date",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(self.hydrate_user(row).await?);
        }
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, password_hash = $3, email = $4, nickname = $5,
                profile_picture = $6, profile_text = $7, current_chat = $8, settings = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.profile_picture)
        .bind(&user.profile_text)
        .bind(user.current_chat)
        .bind(Json(&user.settings))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("user"));
        }
        Ok(())
    }

    async fn set_current_chat(
        &self,
        user_id: Uuid,
        chat_id: Option<Uuid>,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET current_chat = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_user(row).await?)),
            None => Ok(None),
        }
    }

    async fn add_chat_to_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
        self.add_membership(chat_id, user_id).await
    }

    async fn remove_chat_from_user(&self, user_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&mut tx)
            .await?;
        sqlx::query("UPDATE users SET current_chat = NULL WHERE id = $1 AND current_chat = $2")
            .bind(user_id)
            .bind(chat_id)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn insert_chat(&self, chat: &Chat) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO chats (id, chat_name, chat_owner, start_date, most_recent_update)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(chat.id)
        .bind(&chat.chat_name)
        .bind(chat.chat_owner)
        .bind(chat.start_date)
        .bind(chat.most_recent_update)
        .execute(&mut tx)
        .await?;

        for user_id in &chat.users {
            sqlx::query(
                r#"
                INSERT INTO chat_members (chat_id, user_id, joined_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (chat_id, user_id) DO NOTHING
                "#,
            )
            .bind(chat.id)
            .bind(*user_id)
            .bind(Utc::now())
            .execute(&mut tx)
            .await?;
        }

        for message in &chat.messages {
            sqlx::query(
                "INSERT INTO messages (id, chat_id, user_id, sent_at, text, edited) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(message.id)
            .bind(chat.id)
            .bind(message.user)
            .bind(message.timestamp)
            .bind(&message.text)
            .bind(message.edited)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_chat(&self, id: Uuid) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, chat_name, chat_owner, start_date, most_recent_update FROM chats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_chat(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_chats(&self, ids: &[Uuid]) -> Result<Vec<Chat>, AppError> {
        let mut chats = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(chat) = self.find_chat(*id).await? {
                chats.push(chat);
            }
        }
        Ok(chats)
    }

    async fn rename_chat(&self, id: Uuid, chat_name: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE chats SET chat_name = $2 WHERE id = $1")
            .bind(id)
            .bind(chat_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.add_membership(chat_id, user_id).await
    }

    async fn remove_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_chat(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn push_message(&self, chat_id: Uuid, message: &Message) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let touched = sqlx::query("UPDATE chats SET most_recent_update = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(Utc::now())
            .execute(&mut tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO messages (id, chat_id, user_id, sent_at, text, edited) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id)
        .bind(chat_id)
        .bind(message.user)
        .bind(message.timestamp)
        .bind(&message.text)
        .bind(message.edited)
        .execute(&mut tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn update_message_text(
        &self,
        chat_id: Uuid,
        message_id: Uuid,
        text: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET text = $3, edited = true WHERE chat_id = $1 AND id = $2",
        )
        .bind(chat_id)
        .bind(message_id)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_message(&self, chat_id: Uuid, message_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE chat_id = $1 AND id = $2")
            .bind(chat_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert_token(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, created_at)
            VALUES ($1, $2)
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(token_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT token_hash, created_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn remove_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING token_hash, created_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn count_tokens(&self) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
