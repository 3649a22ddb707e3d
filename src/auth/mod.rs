/// Authentication module
///
/// Token signing/verification, password hashing, and the refresh token
/// session lifecycle.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use jwt::{TokenKind, TokenOutcome, TokenSigner};
pub use password::PasswordHasher;
pub use refresh_token::hash_token;
pub use session::{Authenticator, PendingRotation};
