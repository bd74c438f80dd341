use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobpulse::config::Config;
use jobpulse::notifications::{NotificationWorker, Notifier, PushHub};
use jobpulse::users::UserDirectory;
use jobpulse::AppState;

#[derive(Parser, Debug)]
#[command(name = "jobpulse")]
#[command(author, version, about = "Job board backend with real-time notifications", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "jobpulse.toml", env = "JOBPULSE_CONFIG")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting JobPulse v{}", env!("CARGO_PKG_VERSION"));

    let db = jobpulse::db::init(&config.server.data_dir).await?;

    if let (Some(email), Some(password)) = (
        config.auth.admin_email.as_deref(),
        config.auth.admin_password.as_deref(),
    ) {
        UserDirectory::new(db.clone())
            .ensure_admin(email, password)
            .await?;
    }

    // Notification dispatch runs off the request path
    let hub = Arc::new(PushHub::from_config(&config.notifications));
    let (notifier, events) = Notifier::channel(config.notifications.queue_capacity);
    let worker = NotificationWorker::new(db.clone(), hub.clone());
    tokio::spawn(async move {
        worker.run(events).await;
    });

    let metrics_handle = jobpulse::api::metrics::init_metrics()?;
    let state = Arc::new(
        AppState::new(config.clone(), db, notifier, hub).with_metrics(metrics_handle),
    );

    let app = jobpulse::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
