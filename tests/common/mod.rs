#![allow(dead_code)]

use std::net::TcpListener;

use chatroom::auth::{Authenticator, PasswordHasher, TokenSigner};
use chatroom::configuration::{get_configuration, DatabaseSettings, Environment, JwtSettings};
use chatroom::domain::User;
use chatroom::routes::cookies::CookiePolicy;
use chatroom::startup::run;
use chatroom::store::Store;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

pub const PASSWORD: &str = "password";

/// username, nickname
const SEEDED_USERS: [(&str, &str); 3] = [("boggs", "Boggs"), ("tim", "Tim"), ("beth", "Beth")];

pub struct TestApp {
    pub address: String,
    pub store: Store,
    pub authenticator: Authenticator,
    pub client: reqwest::Client,
}

/// Tokens handed out by a successful login
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret".to_string(),
        refresh_secret: "integration-refresh-secret".to_string(),
        access_token_expiry: 30,
        refresh_token_expiry: None,
        issuer: "chatroom-test".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Store::in_memory()).await
}

/// Same application backed by a fresh, migrated Postgres database.
pub async fn spawn_postgres_app() -> TestApp {
    spawn_app_with(Store::postgres(fresh_database().await)).await
}

/// Create a uniquely named database from `configuration.yaml` and migrate it.
pub async fn fresh_database() -> PgPool {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    configure_database(&configuration.database).await
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Spawn the application on a random port over `store`, seeded with the
/// test users.
pub async fn spawn_app_with(store: Store) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let signer = TokenSigner::new(&jwt_settings()).expect("Invalid JWT settings");
    let authenticator = Authenticator::new(signer, store.tokens.clone());
    let hasher = PasswordHasher::new(4);

    for (username, nickname) in SEEDED_USERS {
        let mut user = User::new(
            username.to_string(),
            hasher.hash(PASSWORD).expect("Failed to hash password"),
            format!("{}@example.com", username),
        );
        user.nickname = Some(nickname.to_string());
        store
            .users
            .insert_user(&user)
            .await
            .expect("Failed to seed user");
    }

    let server = run(
        listener,
        store.clone(),
        authenticator.clone(),
        hasher,
        CookiePolicy::for_environment(Environment::Local),
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        authenticator,
        client: reqwest::Client::new(),
    }
}

/// Value of the `refresh_token` cookie set by a response, if any.
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| cookie.strip_prefix("refresh_token="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

pub fn cookie_header(refresh_token: &str) -> String {
    format!("refresh_token={}", refresh_token)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Log a seeded user in and return both tokens.
    pub async fn session(&self, username: &str) -> Session {
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200, "login failed for {}", username);

        let refresh_token = refresh_cookie(&response).expect("No refresh cookie");
        let body: Value = response.json().await.expect("Invalid JSON");
        Session {
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.store
            .users
            .find_user_by_username(username)
            .await
            .unwrap()
            .expect("No such user")
    }

    pub async fn token_count(&self) -> u64 {
        self.store.tokens.count_tokens().await.unwrap()
    }

    pub async fn get(&self, path: &str, access_token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(&self, path: &str, access_token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put(&self, path: &str, access_token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, access_token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Create a chat through the API and return its id.
    pub async fn create_chat(&self, owner: &Session, name: &str, user_list: &str) -> Uuid {
        let response = self
            .post(
                "/api/chats",
                &owner.access_token,
                serde_json::json!({ "chat-name": name, "user-list": user_list }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        body["chatId"].as_str().unwrap().parse().unwrap()
    }
}
