// src/main.rs

use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use teamup_backend::app_state::AppState;
use teamup_backend::config::Config;
use teamup_backend::db::MongoStore;
use teamup_backend::{configure, cors};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let store = Arc::new(MongoStore::new(
        config.mongodb_uri.clone(),
        config.database_name.clone(),
    ));

    // Unreachable database at startup is fatal; the store already logged why.
    store.connect().await.map_err(io::Error::other)?;

    let state = AppState::new(store.clone(), config.clone());
    let port = config.port;

    info!("Server running at http://0.0.0.0:{}", port);
    info!("Allowed CORS origin: {}", config.cors_origin);
    info!("Environment: {}", config.environment);

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&state.config))
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    store.close().await;
    result
}
