use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retomate::api::HttpApi;
use retomate::db::{self, SqliteStore};
use retomate::engine::{self, ProgressEngine};
use retomate::state::AppState;
use retomate::{config, handlers};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "retomate=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = config::load();

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");
  let store = Arc::new(SqliteStore::new(pool));
  let api = Arc::new(HttpApi::new(&config.api_url, config.api_token.clone()));

  let state = AppState::new(
    ProgressEngine::new(config.user_id.clone(), config.block_count),
    store.clone(),
    api.clone(),
    config.grading_delay,
  );

  // Initial load; the progress screen can always be refreshed later
  {
    let blocks = state.engine.lock().expect("Engine lock failed during startup").blocks().to_vec();
    let fetched = engine::fetch_all(api.as_ref(), &config.user_id, &blocks).await;
    let mut engine = state.engine.lock().expect("Engine lock failed during startup");
    let report = engine.apply_fetch(fetched);
    engine.reload_spent(store.as_ref());
    if report.needs_alert() {
      tracing::warn!("Starting without progress data");
    }
  }

  let app = handlers::router(state).layer(TraceLayer::new_for_http());

  let bind_addr = config.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
