pub mod blocks;
pub mod points;
pub mod preferences;
pub mod session;

use std::sync::{Mutex, MutexGuard};

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};

use crate::flow::FlowError;
use crate::ledger::LedgerError;
use crate::state::AppState;

pub use blocks::{list_blocks, refresh, start_block};
pub use points::{get_points, spend_points};
pub use preferences::{get_preferences, update_preferences};
pub use session::{continue_session, exit_session, get_session, select_option};

/// Error returned by JSON handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("block {0} is locked")]
  BlockLocked(u32),
  #[error(transparent)]
  Flow(#[from] FlowError),
  #[error(transparent)]
  Ledger(#[from] LedgerError),
  #[error("session state unavailable")]
  Poisoned,
  #[error("background step failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = match &self {
      AppError::BlockLocked(_) => StatusCode::FORBIDDEN,
      AppError::Flow(FlowError::UnknownOption(_)) => StatusCode::BAD_REQUEST,
      AppError::Flow(_) | AppError::Ledger(_) => StatusCode::CONFLICT,
      AppError::Poisoned | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
  }
}

/// Lock a piece of shared state, turning a poisoned mutex into a 500.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
  mutex.lock().map_err(|_| {
    tracing::error!("Session mutex poisoned - a handler panicked while holding the lock");
    AppError::Poisoned
  })
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/blocks", get(list_blocks))
    .route("/blocks/{block}/start", post(start_block))
    .route("/refresh", post(refresh))
    .route("/session", get(get_session))
    .route("/session/select", post(select_option))
    .route("/session/continue", post(continue_session))
    .route("/session/exit", post(exit_session))
    .route("/points", get(get_points))
    .route("/points/spend", post(spend_points))
    .route("/preferences", get(get_preferences).post(update_preferences))
    .with_state(state)
}
