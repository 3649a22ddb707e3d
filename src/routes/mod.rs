mod account;
mod auth;
mod chats;
pub mod cookies;
mod messages;
mod users;

use actix_web::HttpResponse;

pub use account::{delete_account, get_account, set_current_chat, update_account};
pub use auth::{login, logout, refresh, verify};
pub use chats::{chat_owner, create_chat, delete_chat, get_chat, list_chats, update_chat};
pub use messages::{create_message, delete_message, list_messages, update_message};
pub use users::{create_user, get_user, list_users};

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
