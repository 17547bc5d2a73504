// src/bin/migrate.rs
//
// Usage: migrate [path/to/requests.json]

use std::path::PathBuf;
use std::process::ExitCode;

use env_logger::Env;
use log::{error, info};

use teamup_backend::config::Config;
use teamup_backend::db::MongoStore;
use teamup_backend::migrate::{self, MigrationOutcome, DEFAULT_SOURCE};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let source = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));

    let store = MongoStore::new(config.mongodb_uri.clone(), config.database_name.clone());
    if store.connect().await.is_err() {
        return ExitCode::FAILURE;
    }

    let result = migrate::run(&store, &source).await;
    store.close().await;

    match result {
        Ok(MigrationOutcome::Completed { report, .. }) => {
            info!(
                "Migration completed successfully: {} inserted, {} skipped",
                report.inserted, report.skipped
            );
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
