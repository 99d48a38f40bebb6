//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use axum::{
    Router, http,
    http::{Method, header},
};
use identity::{IdentityConfig, InMemoryIdentityRepository, PgIdentityRepository};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = identity_config()?;
    tracing::info!(?config, "Identity configuration loaded");

    let identity = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            // Startup cleanup: errors here should not prevent server startup
            let repo = PgIdentityRepository::new(pool);
            if let Err(e) = repo.cleanup_expired().await {
                tracing::warn!(
                    error = %e,
                    "Refresh token cleanup failed, continuing anyway"
                );
            }

            identity::identity_router(repo, config)
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            identity::identity_router_generic(InMemoryIdentityRepository::new(), config)
        }
        Err(_) => anyhow::bail!("DATABASE_URL must be set in environment"),
    };

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    // Build router
    let app = Router::new()
        .nest("/api/identity", identity)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build identity configuration from the environment
fn identity_config() -> anyhow::Result<IdentityConfig> {
    let mut config = match env::var("IDENTITY_JWT_SECRET") {
        Ok(secret_b64) => {
            let secret_bytes = platform::crypto::from_base64(&secret_b64)?;
            let secret: [u8; 32] = secret_bytes.as_slice().try_into().map_err(|_| {
                anyhow::anyhow!(
                    "IDENTITY_JWT_SECRET must decode to 32 bytes, got {}",
                    secret_bytes.len()
                )
            })?;
            IdentityConfig {
                jwt_secret: secret,
                ..IdentityConfig::default()
            }
        }
        Err(_) if cfg!(debug_assertions) => IdentityConfig::development(),
        Err(_) => anyhow::bail!("IDENTITY_JWT_SECRET must be set in production"),
    };

    if let Ok(pepper) = env::var("IDENTITY_PASSWORD_PEPPER") {
        config.password_pepper = Some(pepper.into_bytes());
    }
    if let Some(attempts) = parsed::<u32>("IDENTITY_MAX_FAILED_ATTEMPTS")? {
        config.max_failed_attempts = attempts;
    }
    if let Some(minutes) = parsed::<u64>("IDENTITY_LOCK_MINUTES")? {
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| anyhow::anyhow!("IDENTITY_LOCK_MINUTES is too large"))?;
        config.lock_duration = Duration::from_secs(secs);
    }
    if let Some(secs) = parsed::<u64>("IDENTITY_ACCESS_TOKEN_TTL_SECS")? {
        config.access_token_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = parsed::<u64>("IDENTITY_REFRESH_TOKEN_TTL_SECS")? {
        config.refresh_token_ttl = Duration::from_secs(secs);
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid identity configuration: {e}"))?;
    Ok(config)
}

/// Optional numeric environment variable; present but malformed is an error
fn parsed<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => Ok(Some(value.trim().parse::<T>().map_err(|e| {
            anyhow::anyhow!("{name} is not a valid number: {e}")
        })?)),
        Err(_) => Ok(None),
    }
}
