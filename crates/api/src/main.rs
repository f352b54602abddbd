use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubhouse_api::config::ServerConfig;
use clubhouse_api::router::build_app_router;
use clubhouse_api::state::AppState;
use clubhouse_events::SmtpMailer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubhouse_api=debug,clubhouse_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let pool = clubhouse_db::create_pool(&database_url).await?;
    tracing::info!("Database connection pool created");

    clubhouse_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    clubhouse_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Mail delivery ---
    let mailer = Arc::new(SmtpMailer::new(pool.clone(), config.email.clone()));
    if config.email.is_none() {
        tracing::info!("No SMTP environment configured, relying on the email settings section");
    }

    // --- App state ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let state = AppState::new(pool, config.clone(), mailer);
    let app = build_app_router(state, &config);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    // --- Drain in-flight requests ---
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "In-flight requests did not finish in time"
        ),
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
