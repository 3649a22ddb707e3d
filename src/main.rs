use chatroom::auth::{Authenticator, PasswordHasher, TokenSigner};
use chatroom::configuration::{get_configuration, StoreBackend};
use chatroom::routes::cookies::CookiePolicy;
use chatroom::startup::run;
use chatroom::store::{PgStore, Store};
use chatroom::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let signer = TokenSigner::new(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid JWT configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "JWT configuration error")
    })?;

    let store = match configuration.database.backend {
        StoreBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&configuration.database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            PgStore::new(pool.clone()).migrate().await.map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
            })?;

            tracing::info!("Database connection pool created successfully");
            Store::postgres(pool)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            Store::in_memory()
        }
    };

    let authenticator = Authenticator::new(signer, store.tokens.clone());
    let hasher = PasswordHasher::new(configuration.application.bcrypt_cost);
    let cookies = CookiePolicy::for_environment(configuration.application.environment);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, store, authenticator, hasher, cookies)?.await
}
