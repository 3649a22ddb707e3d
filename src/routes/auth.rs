/// Authentication Routes
///
/// Login, access token verification, access token refresh, and logout.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, Claims, PasswordHasher};
use crate::error::{AppError, AuthError, ErrorContext, FieldErrors};
use crate::routes::cookies::{require_refresh_token, CookiePolicy};
use crate::store::Store;
use crate::validators::{validate_password, validate_username};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// POST /api/auth/login
///
/// Returns an access token in the body and sets the refresh token cookie.
///
/// # Errors
/// - 400: Validation errors, or wrong password
/// - 404: Unknown username
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<Store>,
    authenticator: web::Data<Authenticator>,
    hasher: web::Data<PasswordHasher>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let mut errors = FieldErrors::new();
    let username = errors
        .check(validate_username(&form.username))
        .unwrap_or_default();
    let password = errors
        .check(validate_password(&form.password))
        .unwrap_or_default();
    errors.into_result()?;

    let user = store
        .users
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    if !hasher.verify(&password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let access_token = authenticator.issue_access_token(&user)?;
    let refresh_token = authenticator.issue_refresh_token(&user).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok()
        .cookie(cookies.refresh_cookie(refresh_token))
        .json(AccessTokenResponse { access_token }))
}

/// GET /api/auth/verify
///
/// Reaching this handler means the middleware accepted the access token.
pub async fn verify(claims: web::ReqData<Claims>) -> HttpResponse {
    tracing::debug!(user_id = %claims.id, "Access token verified");
    HttpResponse::Ok().json(serde_json::json!({ "msg": "verified" }))
}

/// GET /api/auth/token
///
/// Exchange the refresh token cookie for a new access token. The refresh
/// token is not rotated.
///
/// # Errors
/// - 400: No refresh token cookie
/// - 401: Unknown, invalid, or expired refresh token, or its user is gone
pub async fn refresh(
    req: HttpRequest,
    store: web::Data<Store>,
    authenticator: web::Data<Authenticator>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let refresh_token = require_refresh_token(&req)?;
    let claims = authenticator
        .verify_refresh_token(&refresh_token)
        .await
        .map_err(|e| context.report(e))?;
    let context = context.with_user_id(claims.id);

    // Sessions of a deleted account die on their next use.
    if store.users.find_user(claims.id).await?.is_none() {
        match authenticator.revoke(&refresh_token).await {
            Ok(()) | Err(AppError::Auth(AuthError::TokenNotFound)) => {}
            Err(e) => return Err(context.report(e)),
        }
        return Err(context.report(AuthError::TokenInvalid.into()));
    }

    let access_token = authenticator.renew_access_token(&claims)?;
    context.completed("Token refreshed successfully");

    Ok(HttpResponse::Ok().json(AccessTokenResponse { access_token }))
}

/// GET /api/auth/logout
///
/// Revoke the refresh token and clear its cookie.
///
/// # Errors
/// - 400: No refresh token cookie
/// - 404: The token is not in the store
pub async fn logout(
    req: HttpRequest,
    authenticator: web::Data<Authenticator>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_logout");

    let refresh_token = require_refresh_token(&req)?;
    authenticator
        .revoke(&refresh_token)
        .await
        .map_err(|e| context.report(e))?;

    context.completed("User logged out");

    Ok(HttpResponse::Ok().cookie(cookies.removal()).finish())
}
