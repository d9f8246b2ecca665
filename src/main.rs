use std::sync::Arc;
use std::time::Duration;

use admins_auth::core::auth::{AuthApiState, AuthService, JwtConfig, JwtService, auth_api_router};
use admins_auth::core::config::Config;
use admins_auth::core::db::{DbConfig, PgAdapter, create_pool_with_migrations};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Load application config from environment variables
    let config = Config::from_env();

    // AUTH_DEBUG raises this crate to debug so the session diagnostics show up
    let default_filter = if config.auth_debug {
        "info,admins_auth=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, auth_secret={}, auth_debug={}",
        config.has_database(),
        config.has_auth_secret(),
        config.auth_debug
    );
    if !config.has_auth_secret() {
        tracing::warn!("AUTH_SECRET not set; using the development signing secret");
    }

    let db_config = DbConfig::from_config(&config).expect("DATABASE_URL must be set");
    let pool = create_pool_with_migrations(&db_config)
        .await
        .expect("Failed to initialize database");

    let jwt_config = JwtConfig::from_config(&config).expect("AUTH_SECRET must be set");
    let adapter = Arc::new(PgAdapter::new(pool.clone(), jwt_config.secret.clone()));

    // Expired sessions and verification tokens are purged on a timer; the
    // first tick fires immediately
    let cleanup_adapter = Arc::clone(&adapter);
    let cleanup_interval_secs = config.cleanup_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            match cleanup_adapter.purge_expired().await {
                Ok(purged) if purged.total() > 0 => {
                    tracing::info!(
                        deleted_sessions = purged.sessions,
                        deleted_verification_tokens = purged.verification_tokens,
                        "Purged expired auth rows"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to purge expired auth rows");
                }
            }
        }
    });

    let auth_service = AuthService::new(adapter, JwtService::new(jwt_config), config.auth_debug);

    let state = AuthApiState::new(auth_service)
        .with_pool(pool)
        .secure_cookies(config.secure_cookies);

    let app = auth_api_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
