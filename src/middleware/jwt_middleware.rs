/// JWT Authentication Middleware
///
/// Validates the access token from the Authorization header and injects
/// the decoded claims into request extensions for use by route handlers.
/// Only the signature and expiry are checked here; the store is never read.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderValue, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{TokenKind, TokenOutcome, TokenSigner};
use crate::error::{AppError, AuthError};

/// JWT middleware for protecting routes
///
/// - no header, or no token after the scheme: 400
/// - header that is not visible ASCII, scheme other than `Bearer`, bad
///   signature, expired: 401
pub struct JwtMiddleware {
    signer: TokenSigner,
}

impl JwtMiddleware {
    pub fn new(signer: TokenSigner) -> Self {
        Self { signer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            signer: self.signer.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    signer: TokenSigner,
}

/// Split `Authorization` into the bearer token.
fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = match header {
        Some(value) => value.to_str().map_err(|_| AuthError::TokenInvalid)?,
        None => return Err(AuthError::MissingToken),
    };

    let mut parts = header.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::MissingToken)?;
    let token = parts.next().ok_or(AuthError::MissingToken)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::TokenInvalid);
    }
    Ok(token)
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = match bearer_token(req.headers().get(AUTHORIZATION)) {
            Ok(token) => match self.signer.verify(TokenKind::Access, token) {
                TokenOutcome::Valid(claims) => Ok(claims),
                TokenOutcome::Expired => Err(AuthError::TokenExpired),
                TokenOutcome::Invalid => Err(AuthError::TokenInvalid),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(claims) => {
                tracing::debug!(
                    user_id = %claims.id,
                    username = %claims.username,
                    "JWT validated successfully"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), "Access token rejected: {}", e);
                let error: Error = AppError::from(e).into();
                Box::pin(async move { Err(error) })
            }
        }
    }
}
