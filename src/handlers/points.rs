use axum::{extract::State, Json};
use serde::Deserialize;

use super::{lock, AppError};
use crate::ledger::PointsView;
use crate::state::AppState;

pub async fn get_points(State(state): State<AppState>) -> Result<Json<PointsView>, AppError> {
  Ok(Json(lock(&state.engine)?.ledger().into()))
}

#[derive(Debug, Deserialize)]
pub struct SpendRequest {
  pub amount: u64,
}

/// Redeem points locally. Fails with 409 when the balance is too low.
pub async fn spend_points(
  State(state): State<AppState>,
  Json(request): Json<SpendRequest>,
) -> Result<Json<PointsView>, AppError> {
  let mut engine = lock(&state.engine)?;
  engine.spend(state.store.as_ref(), request.amount)?;
  Ok(Json(engine.ledger().into()))
}
