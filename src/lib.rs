pub mod billing;
pub mod config;
pub mod db;
pub mod gateway;
pub mod models;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] db::DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the payment worker: load configuration, open the database, and run
/// the background sweeps until the process is terminated.
pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    // Open once up front so migrations run before the first sweep.
    let db_path = config.database_path();
    db::sqlite::open_database(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database ready");

    let gateway: Arc<dyn gateway::PaymentGateway> = Arc::new(gateway::StripeClient::new(
        &config.stripe_api_base,
        &config.stripe_secret_key,
    ));

    let _jobs = billing::background::start_background_jobs(db_path, gateway);

    // Worker lifetime is the process lifetime; there is no teardown path.
    loop {
        std::thread::park();
    }
}
