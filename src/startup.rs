use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::auth::{Authenticator, PasswordHasher};
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::cookies::CookiePolicy;
use crate::routes::{
    chat_owner, create_chat, create_message, create_user, delete_account, delete_chat,
    delete_message, get_account, get_chat, get_user, health_check, list_chats, list_messages,
    list_users, login, logout, refresh, set_current_chat, update_account, update_chat,
    update_message, verify,
};
use crate::store::Store;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected JSON payload");
    AppError::from(ValidationError::InvalidFormat("body".to_string())).into()
}

pub fn run(
    listener: TcpListener,
    store: Store,
    authenticator: Authenticator,
    hasher: PasswordHasher,
    cookies: CookiePolicy,
) -> Result<Server, std::io::Error> {
    let signer = authenticator.signer().clone();
    let store = web::Data::new(store);
    let authenticator = web::Data::new(authenticator);
    let hasher = web::Data::new(hasher);
    let cookies = web::Data::new(cookies);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())

            // Shared state
            .app_data(store.clone())
            .app_data(authenticator.clone())
            .app_data(hasher.clone())
            .app_data(cookies.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error))

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    // Public routes (no access token required)
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/token", web::get().to(refresh))
                    .route("/auth/logout", web::get().to(logout))
                    .route("/users", web::post().to(create_user))

                    // Protected routes (require JWT authentication)
                    .service(
                        web::scope("")
                            .wrap(JwtMiddleware::new(signer.clone()))
                            .route("/auth/verify", web::get().to(verify))
                            .route("/users", web::get().to(list_users))
                            .route("/users/{username}", web::get().to(get_user))
                            .service(
                                web::resource("/users/{username}/account")
                                    .route(web::get().to(get_account))
                                    .route(web::put().to(update_account))
                                    .route(web::delete().to(delete_account)),
                            )
                            .route(
                                "/users/{username}/account/{chat_id}",
                                web::put().to(set_current_chat),
                            )
                            .service(
                                web::resource("/chats")
                                    .route(web::get().to(list_chats))
                                    .route(web::post().to(create_chat)),
                            )
                            .service(
                                web::resource("/chats/{chat_id}")
                                    .route(web::get().to(get_chat))
                                    .route(web::put().to(update_chat))
                                    .route(web::delete().to(delete_chat)),
                            )
                            .route("/chats/{chat_id}/owner", web::get().to(chat_owner))
                            .service(
                                web::resource("/chats/{chat_id}/messages")
                                    .route(web::get().to(list_messages))
                                    .route(web::post().to(create_message)),
                            )
                            .service(
                                web::resource("/chats/{chat_id}/messages/{message_id}")
                                    .route(web::put().to(update_message))
                                    .route(web::delete().to(delete_message)),
                            ),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
