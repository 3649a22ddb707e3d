/// Route-scoped middleware
///
/// Request logging is global and lives in `logger`.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
