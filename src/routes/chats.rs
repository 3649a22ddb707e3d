/// Chat Routes
///
/// Chat rooms and their membership. The owner is always a member and can
/// never be removed; only the owner may add members, rename, or delete.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Claims;
use crate::domain::{Chat, ChatSummary, Message, User};
use crate::error::{AppError, ErrorContext, FieldErrors, ValidationError};
use crate::store::Store;
use crate::validators::{parse_user_list, validate_chat_name};

/// Fetch a chat or 404.
pub(crate) async fn load_chat(store: &Store, chat_id: Uuid) -> Result<Chat, AppError> {
    store
        .chats
        .find_chat(chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("chat"))
}

/// Fetch a chat the caller belongs to; 404 if unknown, 403 if not a member.
pub(crate) async fn load_member_chat(
    store: &Store,
    claims: &Claims,
    chat_id: Uuid,
) -> Result<Chat, AppError> {
    let chat = load_chat(store, chat_id).await?;
    if !chat.has_member(claims.id) {
        return Err(AppError::forbidden("not a member of this chat"));
    }
    Ok(chat)
}

/// Resolve usernames to users; the first unknown name is a 404.
async fn resolve_usernames(store: &Store, usernames: &[String]) -> Result<Vec<User>, AppError> {
    let mut users = Vec::with_capacity(usernames.len());
    for username in usernames {
        let user = store
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", username)))?;
        users.push(user);
    }
    Ok(users)
}

/// GET /api/chats
pub async fn list_chats(
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let user = store
        .users
        .find_user(claims.id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let chats: Vec<ChatSummary> = store
        .chats
        .find_chats(&user.chats)
        .await?
        .iter()
        .map(ChatSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "chats": chats })))
}

#[derive(Deserialize)]
pub struct CreateChatRequest {
    #[serde(rename = "chat-name", default)]
    pub chat_name: String,
    #[serde(rename = "user-list", default)]
    pub user_list: String,
}

/// POST /api/chats
///
/// # Errors
/// - 400: Missing chat name
/// - 404: A listed username does not exist
pub async fn create_chat(
    form: web::Json<CreateChatRequest>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chat_creation").with_user_id(claims.id);

    let mut errors = FieldErrors::new();
    let chat_name = errors
        .check(validate_chat_name(&form.chat_name))
        .unwrap_or_default();
    errors.into_result()?;

    let invited = resolve_usernames(&store, &parse_user_list(&form.user_list)).await?;

    let mut members = vec![claims.id];
    for user in &invited {
        if !members.contains(&user.id) {
            members.push(user.id);
        }
    }

    let chat = Chat::new(chat_name, claims.id, members);
    store.chats.insert_chat(&chat).await?;
    for member in &chat.users {
        store.users.add_chat_to_user(*member, chat.id).await?;
    }

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %claims.id,
        chat_id = %chat.id,
        members = chat.users.len(),
        "Chat created"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "chatId": chat.id })))
}

/// Member as shown inside a chat
#[derive(Serialize)]
pub struct ChatMember {
    pub id: Uuid,
    pub username: String,
    pub nickname: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Serialize)]
pub struct ChatDetail {
    pub id: Uuid,
    pub chat_name: String,
    pub chat_owner: Uuid,
    pub users: Vec<ChatMember>,
    pub messages: Vec<Message>,
}

/// GET /api/chats/{chat_id}
pub async fn get_chat(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let chat = load_member_chat(&store, &claims, path.into_inner()).await?;

    let mut users = Vec::with_capacity(chat.users.len());
    for id in &chat.users {
        if let Some(user) = store.users.find_user(*id).await? {
            users.push(ChatMember {
                id: user.id,
                username: user.username,
                nickname: user.nickname,
                profile_picture: user.profile_picture,
            });
        }
    }

    let detail = ChatDetail {
        id: chat.id,
        chat_name: chat.chat_name,
        chat_owner: chat.chat_owner,
        users,
        messages: chat.messages,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "chat": detail })))
}

/// Body of `PUT /api/chats/{chat_id}`
#[derive(Deserialize)]
pub struct UpdateChatRequest {
    pub update: Option<String>,
    #[serde(rename = "user-list")]
    pub user_list: Option<String>,
    #[serde(rename = "chat-name")]
    pub chat_name: Option<String>,
    pub username: Option<String>,
}

/// PUT /api/chats/{chat_id}
///
/// `update: "add"` adds `user-list` and optionally renames; owner only.
/// `update: "remove"` removes `username`; the owner, or a member leaving.
///
/// # Errors
/// - 400: Missing or unknown `update`
/// - 403: Not allowed to perform the change
/// - 404: Unknown chat or username
pub async fn update_chat(
    path: web::Path<Uuid>,
    form: web::Json<UpdateChatRequest>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chat_update").with_user_id(claims.id);
    let chat = load_chat(&store, path.into_inner()).await?;
    let form = form.into_inner();

    match form.update.as_deref() {
        Some("add") => {
            if !chat.is_owner(claims.id) {
                return Err(AppError::forbidden("only the owner can add members"));
            }

            let mut errors = FieldErrors::new();
            let chat_name = match form.chat_name.as_deref().filter(|n| !n.trim().is_empty()) {
                Some(name) => errors.check(validate_chat_name(name)),
                None => None,
            };
            errors.into_result()?;

            let usernames = parse_user_list(form.user_list.as_deref().unwrap_or_default());
            for user in resolve_usernames(&store, &usernames).await? {
                store.chats.add_member(chat.id, user.id).await?;
                store.users.add_chat_to_user(user.id, chat.id).await?;
            }
            if let Some(name) = chat_name {
                store.chats.rename_chat(chat.id, &name).await?;
            }

            tracing::info!(
                request_id = %context.request_id,
                operation = %context.operation,
                user_id = %claims.id,
                chat_id = %chat.id,
                added = usernames.len(),
                "Members added"
            );
        }
        Some("remove") => {
            let username = form
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ValidationError::Required("username".to_string()))?;

            if !chat.is_owner(claims.id) && username != claims.username {
                return Err(AppError::forbidden("cannot remove other members"));
            }

            let user = store
                .users
                .find_user_by_username(username)
                .await?
                .ok_or_else(|| AppError::not_found("user"))?;
            if chat.is_owner(user.id) {
                return Err(AppError::forbidden("the owner cannot be removed"));
            }

            store.chats.remove_member(chat.id, user.id).await?;
            store.users.remove_chat_from_user(user.id, chat.id).await?;

            tracing::info!(
                request_id = %context.request_id,
                operation = %context.operation,
                user_id = %claims.id,
                chat_id = %chat.id,
                removed = %user.id,
                "Member removed"
            );
        }
        _ => {
            return Err(ValidationError::InvalidFormat("update".to_string()).into());
        }
    }

    Ok(HttpResponse::Ok().finish())
}

/// DELETE /api/chats/{chat_id}
pub async fn delete_chat(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("chat_deletion").with_user_id(claims.id);
    let chat = load_chat(&store, path.into_inner()).await?;

    if !chat.is_owner(claims.id) {
        return Err(AppError::forbidden("only the owner can delete a chat"));
    }

    for member in &chat.users {
        store.users.remove_chat_from_user(*member, chat.id).await?;
    }
    store.chats.delete_chat(chat.id).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %claims.id,
        chat_id = %chat.id,
        "Chat deleted"
    );

    Ok(HttpResponse::Ok().finish())
}

/// GET /api/chats/{chat_id}/owner
///
/// 200 `{owner: true}` for the owner, 403 `{owner: false}` for anyone else.
pub async fn chat_owner(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let chat = load_chat(&store, path.into_inner()).await?;

    if chat.is_owner(claims.id) {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "owner": true })))
    } else {
        Ok(HttpResponse::Forbidden().json(serde_json::json!({ "owner": false })))
    }
}
