use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// Per-request correlation id.
///
/// Handlers can take it as `web::ReqData<RequestId>`; anything running while
/// the request is in flight (error contexts, error responses) reads it with
/// [`RequestId::current`]. The same id is echoed in the `x-request-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Id of the request being served on this task, if any.
    pub fn current() -> Option<RequestId> {
        CURRENT_REQUEST_ID.try_with(|id| *id).ok()
    }

    /// The current request's id, or a fresh one outside a request.
    pub fn current_or_new() -> RequestId {
        Self::current().unwrap_or_else(|| RequestId(Uuid::new_v4()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Request/response logging middleware
///
/// Errors raised by inner middleware are rendered here, so every response
/// (including 400/401 from the JWT guard) carries `x-request-id`.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = RequestId(Uuid::new_v4());
        let method = req.method().to_string();
        let path = req.path().to_string();

        req.extensions_mut().insert(request_id);
        tracing::info!(%request_id, %method, %path, "Request started");

        let http_request = req.request().clone();
        let service = self.service.clone();

        Box::pin(CURRENT_REQUEST_ID.scope(request_id, async move {
            let mut res = match service.call(req).await {
                Ok(res) => res.map_into_left_body(),
                Err(e) => ServiceResponse::from_err(e, http_request).map_into_right_body(),
            };

            let status = res.status();
            tracing::info!(
                %request_id,
                %method,
                %path,
                status = status.as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request completed"
            );

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                res.headers_mut()
                    .insert(HeaderName::from_static("x-request-id"), value);
            }

            Ok(res)
        }))
    }
}
