use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoctu::config::{AppConfig, EVENT_QUEUE_CAPACITY, NOTIFICATION_PURGE_INTERVAL_SECS};
use hoctu::services::events;
use hoctu::state::AppState;
use hoctu::{app, db, response};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hoctu=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = AppConfig::load();
  response::set_dev_mode(config.dev_mode);

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");
  tracing::info!("Database ready at {}", config.database_path.display());

  let (sender, receiver) = events::channel(EVENT_QUEUE_CAPACITY);
  let worker = tokio::spawn(events::run_worker(
    pool.clone(),
    config.notification_ttl_days,
    receiver,
  ));
  let purge = tokio::spawn(events::run_notification_purge(
    pool.clone(),
    NOTIFICATION_PURGE_INTERVAL_SECS,
  ));

  let bind_addr = config.bind_addr();
  let state = AppState::new(pool, config, sender);
  let router = app(state);

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, router)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server failed to start");

  // The router (and with it every event sender) is gone; let the worker drain
  purge.abort();
  if let Err(e) = worker.await {
    tracing::warn!("Event worker ended abnormally: {}", e);
  }
  tracing::info!("Shut down");
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("Failed to listen for shutdown signal: {}", e);
  }
  tracing::info!("Shutdown signal received");
}
