//! Account Service Server
//!
//! Loads configuration from the environment, migrates the database and
//! serves every route group. Deployments that need a narrower surface can
//! build their own router with [`RouterBuilder`].

use std::sync::Arc;

use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use account_service::{
    api::{AppState, RouterBuilder},
    config::{env, AppConfig},
    database::PgAccountRepository,
    service::{
        AccessGate, AccountService, EmailService, JwtService, LifecyclePolicy, LogNotifier,
        Notifier,
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(env::get_string("LOG_LEVEL", "info")),
    )
    .init();

    log::info!("Starting Account Service v{}", account_service::VERSION);

    let config = AppConfig::from_env()?;
    config.validate()?;
    log::info!("Configuration loaded and validated");

    let database_pool = config.database.create_pool().await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&database_pool).await?;
    log::info!("Database migrations completed");

    let notifier: Arc<dyn Notifier> = match &config.email {
        Some(email_config) => {
            log::info!(
                "Sending mail through {}:{}",
                email_config.smtp_server,
                email_config.smtp_port
            );
            Arc::new(EmailService::new(email_config)?)
        }
        None => {
            log::warn!("SEND_REAL_MAIL is off; verification and lockout emails are not delivered");
            Arc::new(LogNotifier)
        }
    };

    let repository = Arc::new(PgAccountRepository::new(database_pool.clone()));
    let account_service = Arc::new(AccountService::new(
        repository,
        notifier,
        LifecyclePolicy::from(&config.security),
        config.server.base_url.clone(),
    ));
    let jwt_service = Arc::new(JwtService::from_config(&config.jwt)?);

    log::info!(
        "Lockout after {} failed logins, access tokens valid for {} minutes",
        config.security.max_login_attempts,
        config.jwt.access_token_expire_minutes
    );

    let app_state = AppState {
        account_service,
        gate: AccessGate::new(jwt_service.clone()),
        jwt_service,
    };

    let app = RouterBuilder::with_all_routes()
        .build(app_state.clone())
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .into_inner(),
        );

    let bind_addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down, closing database pool");
    database_pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}
