/// Message Routes
///
/// Messages live inside their chat. Reading and posting need membership;
/// editing needs authorship; deleting needs authorship or chat ownership.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::domain::Message;
use crate::error::{AppError, ErrorContext};
use crate::routes::chats::load_member_chat;
use crate::store::Store;
use crate::validators::validate_message_text;

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub text: String,
}

/// GET /api/chats/{chat_id}/messages
pub async fn list_messages(
    path: web::Path<Uuid>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let chat = load_member_chat(&store, &claims, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "messages": chat.messages })))
}

/// POST /api/chats/{chat_id}/messages
///
/// # Errors
/// - 400: Empty or over-long text
/// - 403: Not a member
pub async fn create_message(
    path: web::Path<Uuid>,
    form: web::Json<MessageRequest>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("message_creation").with_user_id(claims.id);
    let chat = load_member_chat(&store, &claims, path.into_inner()).await?;
    let text = validate_message_text(&form.text)?;

    let message = Message::new(claims.id, text);
    if !store.chats.push_message(chat.id, &message).await? {
        return Err(AppError::not_found("chat"));
    }

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %claims.id,
        chat_id = %chat.id,
        message_id = %message.id,
        "Message posted"
    );

    Ok(HttpResponse::Ok().json(message))
}

/// PUT /api/chats/{chat_id}/messages/{message_id}
///
/// Unchanged text is accepted and not saved.
pub async fn update_message(
    path: web::Path<(Uuid, Uuid)>,
    form: web::Json<MessageRequest>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, message_id) = path.into_inner();
    let chat = load_member_chat(&store, &claims, chat_id).await?;
    let message = chat
        .message(message_id)
        .ok_or_else(|| AppError::not_found("message"))?;

    if message.user != claims.id {
        return Err(AppError::forbidden("only the author can edit a message"));
    }

    let text = validate_message_text(&form.text)?;
    if text == message.text {
        return Ok(HttpResponse::Ok().finish());
    }

    store
        .chats
        .update_message_text(chat.id, message_id, &text)
        .await?;

    tracing::debug!(message_id = %message_id, "Message edited");

    Ok(HttpResponse::Ok().finish())
}

/// DELETE /api/chats/{chat_id}/messages/{message_id}
pub async fn delete_message(
    path: web::Path<(Uuid, Uuid)>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let (chat_id, message_id) = path.into_inner();
    let chat = load_member_chat(&store, &claims, chat_id).await?;
    let message = chat
        .message(message_id)
        .ok_or_else(|| AppError::not_found("message"))?;

    if message.user != claims.id && !chat.is_owner(claims.id) {
        return Err(AppError::forbidden("only the author or the chat owner can delete a message"));
    }

    store.chats.remove_message(chat.id, message_id).await?;

    tracing::debug!(message_id = %message_id, "Message deleted");

    Ok(HttpResponse::Ok().finish())
}
