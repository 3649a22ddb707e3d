/// Refresh token cookie
///
/// The refresh token only travels in an HttpOnly cookie, never in a body.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;

use crate::configuration::Environment;
use crate::error::AuthError;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// How the refresh cookie is built. `Secure` is dropped for local
/// development over plain HTTP.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self::new(!environment.is_local())
    }

    pub fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE, token)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .finish()
    }

    /// Expired, empty cookie that makes the browser drop the refresh token.
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = self.refresh_cookie(String::new());
        cookie.make_removal();
        cookie
    }
}

/// Refresh token presented with the request, if any.
pub fn presented_refresh_token(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Same as [`presented_refresh_token`], missing is a 400.
pub fn require_refresh_token(req: &HttpRequest) -> Result<String, AuthError> {
    presented_refresh_token(req).ok_or(AuthError::MissingToken)
}
