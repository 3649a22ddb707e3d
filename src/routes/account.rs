/// Account Routes
///
/// The caller's own record. Every mutation that changes what the tokens
/// carry (username, nickname, current chat) rotates the refresh token and
/// hands back a fresh access token. The presented token is checked before
/// the write and only swapped once the write has succeeded.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Authenticator, Claims, PasswordHasher};
use crate::domain::{AccountView, User};
use crate::error::{AppError, AuthError, ErrorContext, FieldErrors, ValidationError};
use crate::routes::cookies::{presented_refresh_token, require_refresh_token, CookiePolicy};
use crate::store::Store;
use crate::validators::{
    validate_email, validate_new_password, validate_nickname, validate_password_confirmation,
    validate_profile_text, validate_username, UPDATE_EMAIL, UPDATE_PROFILE_TEXT,
};

const THEME_SETTING: &str = "theme";

/// Load the caller and make sure `{username}` names them.
async fn load_self(store: &Store, claims: &Claims, username: &str) -> Result<User, AppError> {
    let user = store
        .users
        .find_user(claims.id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    if user.username != username {
        return Err(AppError::forbidden("not your account"));
    }
    Ok(user)
}

/// Partial account update. Absent or empty fields keep their value.
#[derive(Deserialize, Default)]
pub struct AccountUpdateRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "password-confirm")]
    pub password_confirm: Option<String>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    #[serde(rename = "profile-text")]
    pub profile_text: Option<String>,
    pub profile_picture: Option<String>,
    pub theme: Option<String>,
}

fn provided(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

#[derive(Serialize)]
pub struct AccountUpdateResponse {
    pub access_token: String,
    pub username: String,
    pub user_nickname: String,
}

/// GET /api/users/{username}/account
pub async fn get_account(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let user = load_self(&store, &claims, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": AccountView::from(&user) })))
}

/// PUT /api/users/{username}/account
///
/// # Errors
/// - 400: Validation errors, or no refresh token cookie
/// - 401: The refresh token is unknown, invalid, expired, or not the caller's
/// - 403: `{username}` is not the caller
pub async fn update_account(
    req: HttpRequest,
    path: web::Path<String>,
    form: web::Json<AccountUpdateRequest>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
    authenticator: web::Data<Authenticator>,
    hasher: web::Data<PasswordHasher>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_update").with_user_id(claims.id);
    let current = load_self(&store, &claims, &path).await?;
    let form = form.into_inner();

    let mut updated = current.clone();

    if let Some(theme) = provided(&form.theme) {
        updated
            .settings
            .insert(THEME_SETTING.to_string(), theme.trim().to_string());
    } else {
        let mut errors = FieldErrors::new();

        if let Some(username) = provided(&form.username) {
            if let Some(username) = errors.check(validate_username(username)) {
                if username != current.username
                    && store.users.find_user_by_username(&username).await?.is_some()
                {
                    errors.push(ValidationError::Duplicate("username".to_string()));
                }
                updated.username = username;
            }
        }
        if let Some(password) = provided(&form.password) {
            let checked = errors.check(validate_new_password(password));
            let confirmed = errors.check(validate_password_confirmation(
                password,
                form.password_confirm.as_deref(),
            ));
            if let (Some(password), Some(())) = (checked, confirmed) {
                updated.password_hash = hasher.hash(&password)?;
            }
        }
        if let Some(email) = provided(&form.email) {
            if let Some(email) = errors.check(validate_email(email, UPDATE_EMAIL)) {
                updated.email = email;
            }
        }
        if let Some(nickname) = provided(&form.nickname) {
            updated.nickname = errors.check(validate_nickname(nickname));
        }
        if let Some(text) = provided(&form.profile_text) {
            updated.profile_text =
                errors.check(validate_profile_text("profile-text", text, UPDATE_PROFILE_TEXT));
        }
        if let Some(picture) = provided(&form.profile_picture) {
            updated.profile_picture = Some(picture.to_string());
        }

        errors.into_result()?;
    }

    let presented = require_refresh_token(&req)?;
    let pending = authenticator
        .begin_rotation(&presented, &updated)
        .await
        .map_err(|e| context.report(e))?;
    store
        .users
        .update_user(&updated)
        .await
        .map_err(|e| context.report(e))?;
    let refresh_token = authenticator
        .complete_rotation(pending, &updated)
        .await
        .map_err(|e| context.report(e))?;
    let access_token = authenticator.issue_access_token(&updated)?;

    context.completed("Account updated");

    Ok(HttpResponse::Ok()
        .cookie(cookies.refresh_cookie(refresh_token))
        .json(AccountUpdateResponse {
            access_token,
            username: updated.username,
            user_nickname: updated.nickname.unwrap_or_default(),
        }))
}

/// PUT /api/users/{username}/account/{chat_id}
///
/// Point the caller's current chat at `{chat_id}`.
///
/// # Errors
/// - 400: No refresh token cookie
/// - 401: Refresh token rejected
/// - 403: Not the caller's account, or not a member of the chat
/// - 404: Unknown chat
pub async fn set_current_chat(
    req: HttpRequest,
    path: web::Path<(String, Uuid)>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
    authenticator: web::Data<Authenticator>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let (username, chat_id) = path.into_inner();
    let context = ErrorContext::new("current_chat_change").with_user_id(claims.id);
    let user = load_self(&store, &claims, &username).await?;

    let chat = store
        .chats
        .find_chat(chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("chat"))?;
    if !chat.has_member(user.id) {
        return Err(AppError::forbidden("not a member of this chat"));
    }

    let presented = require_refresh_token(&req)?;
    let mut updated = user;
    updated.current_chat = Some(chat.id);
    let pending = authenticator
        .begin_rotation(&presented, &updated)
        .await
        .map_err(|e| context.report(e))?;

    let updated = store
        .users
        .set_current_chat(updated.id, Some(chat.id))
        .await
        .map_err(|e| context.report(e))?
        .ok_or_else(|| context.report(AppError::not_found("user")))?;
    let refresh_token = authenticator
        .complete_rotation(pending, &updated)
        .await
        .map_err(|e| context.report(e))?;
    let access_token = authenticator.issue_access_token(&updated)?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %claims.id,
        chat_id = %chat.id,
        "Current chat changed"
    );

    Ok(HttpResponse::Ok()
        .cookie(cookies.refresh_cookie(refresh_token))
        .json(serde_json::json!({ "access_token": access_token })))
}

/// DELETE /api/users/{username}/account
///
/// Leaves every chat, deletes the chats the caller owns, deletes the user,
/// revokes the presented refresh token and clears the cookie.
pub async fn delete_account(
    req: HttpRequest,
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
    authenticator: web::Data<Authenticator>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_deletion").with_user_id(claims.id);
    let user = load_self(&store, &claims, &path).await?;

    for chat in store.chats.find_chats(&user.chats).await? {
        if chat.is_owner(user.id) {
            for member in &chat.users {
                store.users.remove_chat_from_user(*member, chat.id).await?;
            }
            store.chats.delete_chat(chat.id).await?;
        } else {
            store.chats.remove_member(chat.id, user.id).await?;
            store.users.remove_chat_from_user(user.id, chat.id).await?;
        }
    }

    store.users.delete_user(user.id).await?;

    if let Some(token) = presented_refresh_token(&req) {
        match authenticator.revoke(&token).await {
            Ok(()) | Err(AppError::Auth(AuthError::TokenNotFound)) => {}
            Err(e) => return Err(e),
        }
    }

    context.completed("Account deleted");

    Ok(HttpResponse::Ok().cookie(cookies.removal()).finish())
}
