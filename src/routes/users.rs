/// User Routes
///
/// Account creation and public profiles.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{Claims, PasswordHasher};
use crate::domain::{PublicProfile, User};
use crate::error::{AppError, ErrorContext, FieldErrors, ValidationError};
use crate::store::Store;
use crate::validators::{
    validate_email, validate_nickname, validate_password, validate_password_confirmation,
    validate_profile_text, validate_username, SIGNUP_EMAIL, SIGNUP_PROFILE_TEXT,
};

/// Sign-up form
#[derive(Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    pub profile_text: Option<String>,
    pub profile_picture: Option<String>,
}

/// POST /api/users
///
/// # Errors
/// - 400: Validation errors, grouped by field (including a taken username)
pub async fn create_user(
    form: web::Json<SignUpRequest>,
    store: web::Data<Store>,
    hasher: web::Data<PasswordHasher>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_creation");
    let form = form.into_inner();

    let mut errors = FieldErrors::new();
    let username = errors
        .check(validate_username(&form.username))
        .unwrap_or_default();
    let password = errors
        .check(validate_password(&form.password))
        .unwrap_or_default();
    errors.check(validate_password_confirmation(
        &form.password,
        form.password_confirm.as_deref(),
    ));
    let email = errors
        .check(validate_email(&form.email, SIGNUP_EMAIL))
        .unwrap_or_default();
    let nickname = errors
        .check(validate_nickname(&form.nickname))
        .unwrap_or_default();
    let profile_text = match form.profile_text.as_deref() {
        Some(text) => errors.check(validate_profile_text("profile_text", text, SIGNUP_PROFILE_TEXT)),
        None => None,
    };

    if !errors.contains("username") && store.users.find_user_by_username(&username).await?.is_some() {
        errors.push(ValidationError::Duplicate("username".to_string()));
    }
    errors.into_result()?;

    let mut user = User::new(username, hasher.hash(&password)?, email);
    user.nickname = Some(nickname);
    user.profile_text = profile_text.filter(|text| !text.is_empty());
    user.profile_picture = form.profile_picture.filter(|picture| !picture.is_empty());

    store.users.insert_user(&user).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user.id,
        "User created"
    );

    Ok(HttpResponse::Ok().json(PublicProfile::from(&user)))
}

/// GET /api/users
pub async fn list_users(
    claims: web::ReqData<Claims>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let users = store.users.list_users().await?;
    let list: Vec<PublicProfile> = users.iter().map(PublicProfile::from).collect();

    tracing::debug!(user_id = %claims.id, count = list.len(), "Listed users");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "list": list })))
}

/// GET /api/users/{username}
///
/// # Errors
/// - 404: Unknown username
pub async fn get_user(
    path: web::Path<String>,
    store: web::Data<Store>,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    let user = store
        .users
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": PublicProfile::from(&user) })))
}
