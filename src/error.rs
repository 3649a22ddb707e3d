/// Error handling for the whole application.
///
/// Domain-specific error enums (validation, database, auth, configuration)
/// fold into a single [`AppError`], which knows how to log itself and how to
/// become an HTTP response.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use crate::logger::RequestId;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// A single failed rule on a single input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    InnerWhitespace(String),
    MissingDigit(String),
    MissingSpecialCharacter(String),
    Mismatch(String),
    Duplicate(String),
    Required(String),
}

impl ValidationError {
    /// Name of the offending field, used to group messages.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField(field)
            | ValidationError::TooShort(field, _)
            | ValidationError::TooLong(field, _)
            | ValidationError::InvalidFormat(field)
            | ValidationError::InnerWhitespace(field)
            | ValidationError::MissingDigit(field)
            | ValidationError::MissingSpecialCharacter(field)
            | ValidationError::Mismatch(field)
            | ValidationError::Duplicate(field)
            | ValidationError::Required(field) => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::InnerWhitespace(field) => {
                write!(f, "{} must not contain whitespace", field)
            }
            ValidationError::MissingDigit(field) => {
                write!(f, "{} must contain at least one number", field)
            }
            ValidationError::MissingSpecialCharacter(field) => {
                write!(f, "{} must contain at least one special character", field)
            }
            ValidationError::Mismatch(_) => write!(f, "Passwords must match"),
            ValidationError::Duplicate(field) => write!(f, "That {} already exists", field),
            ValidationError::Required(field) => write!(f, "{} is required", field),
        }
    }
}

impl StdError for ValidationError {}

/// Validation failures grouped by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0
            .entry(error.field().to_string())
            .or_default()
            .push(error.to_string());
    }

    /// Record the error of a validator result, if any, and hand back the value.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .values()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication and authorization errors
#[derive(Debug)]
pub enum AuthError {
    /// Known user, wrong password
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    /// No credential where one is required
    MissingToken,
    /// Logout of a refresh token the store does not hold
    TokenNotFound,
    Forbidden(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::TokenNotFound => write!(f, "Refresh token not found"),
            AuthError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(FieldErrors),
    Database(DatabaseError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::Database(DatabaseError::NotFound(what.into()))
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        AppError::Auth(AuthError::Forbidden(why.into()))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(err);
        AppError::Validation(errors)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    db_err.message().to_string(),
                ))
            }
            other => AppError::Database(DatabaseError::UnexpectedError(other.to_string())),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("Token generation failed: {}", err))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password hashing failed: {}", err))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Id of the failed request; matches the `x-request-id` header
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
    /// Field-level messages for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            validation: None,
        }
    }

    pub fn with_validation(mut self, messages: BTreeMap<String, Vec<String>>) -> Self {
        self.validation = Some(messages);
        self
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string())
                }
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_CREDENTIALS",
                    "Invalid credentials".to_string(),
                ),
                AuthError::MissingToken => (
                    StatusCode::BAD_REQUEST,
                    "MISSING_TOKEN",
                    "Missing authentication token".to_string(),
                ),
                AuthError::TokenExpired | AuthError::TokenInvalid => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                ),
                AuthError::TokenNotFound => (
                    StatusCode::NOT_FOUND,
                    "TOKEN_NOT_FOUND",
                    "Refresh token not found".to_string(),
                ),
                AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string()),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.classify();

        let mut error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        if let AppError::Validation(errors) = self {
            error_response = error_response.with_validation(errors.messages().clone());
        }

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::NotFound(_)) => {
                tracing::info!(request_id = request_id, error = %self, "Record not found");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = RequestId::current_or_new().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// ============================================================================
// 4. ERROR CONTEXT
// ============================================================================

/// Per-operation context threaded through handler logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    /// Context for `operation` within the request currently being served.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::current_or_new().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    fn user(&self) -> &str {
        self.user_id.as_deref().unwrap_or("-")
    }

    /// Log a successful outcome of the operation.
    pub fn completed(&self, message: &str) {
        tracing::info!(
            request_id = %self.request_id,
            operation = %self.operation,
            user_id = %self.user(),
            "{}",
            message
        );
    }

    /// Log `error` against the operation and hand it back, for `map_err`.
    pub fn report(&self, error: AppError) -> AppError {
        tracing::warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            user_id = %self.user(),
            error = %error,
            "Operation failed"
        );
        error
    }
}
