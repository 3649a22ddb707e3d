//! Documents persisted by the store.

mod chat;
mod user;

pub use chat::{Chat, ChatSummary, Message};
pub use user::{AccountView, PublicProfile, User};
