use axum::{
  extract::{Path, State},
  Json,
};
use serde::Serialize;

use super::{lock, AppError};
use crate::api::TaskSource;
use crate::domain::BlockId;
use crate::engine::{self, RefreshReport};
use crate::flow::FlowView;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BlockCard {
  pub block: BlockId,
  pub total: usize,
  pub completed: usize,
  pub percentage: u8,
  pub is_unlocked: bool,
  pub is_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct BlocksView {
  pub blocks: Vec<BlockCard>,
  pub unlocked: Vec<BlockId>,
}

pub async fn list_blocks(State(state): State<AppState>) -> Result<Json<BlocksView>, AppError> {
  let engine = lock(&state.engine)?;
  let blocks = engine
    .block_progress()
    .into_iter()
    .map(|p| BlockCard {
      block: p.block,
      total: p.total,
      completed: p.completed,
      percentage: p.percentage(),
      is_unlocked: p.is_unlocked,
      is_loaded: p.is_loaded,
    })
    .collect();
  Ok(Json(BlocksView {
    blocks,
    unlocked: engine.unlocked_blocks().iter().copied().collect(),
  }))
}

#[derive(Debug, Serialize)]
pub struct RefreshView {
  #[serde(flatten)]
  pub report: RefreshReport,
  /// Set when the screen cannot show anything useful
  pub alert: Option<String>,
  pub unsynced: usize,
}

/// Pull-to-refresh: resend unconfirmed answers, then reload everything.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshView>, AppError> {
  let (user_id, blocks) = {
    let engine = lock(&state.engine)?;
    (engine.user_id().to_string(), engine.blocks().to_vec())
  };

  let pending = lock(&state.flow)?.take_unsynced();
  if !pending.is_empty() {
    let still_failing = engine::resend_unsynced(state.api.as_ref(), pending).await;
    lock(&state.flow)?.requeue_unsynced(still_failing);
  }

  let fetched = engine::fetch_all(state.api.as_ref(), &user_id, &blocks).await;

  let report = {
    let mut engine = lock(&state.engine)?;
    let report = engine.apply_fetch(fetched);
    engine.reload_spent(state.store.as_ref());
    report
  };

  let alert = report.needs_alert().then(|| {
    tracing::warn!(user_id = %user_id, "Progress could not be loaded");
    "No se pudo cargar tu progreso. Intenta de nuevo.".to_string()
  });
  let unsynced = lock(&state.flow)?.unsynced().len();

  Ok(Json(RefreshView {
    report,
    alert,
    unsynced,
  }))
}

/// Open a block and present its first unanswered task.
pub async fn start_block(
  State(state): State<AppState>,
  Path(block): Path<BlockId>,
) -> Result<Json<FlowView>, AppError> {
  let loaded = {
    let engine = lock(&state.engine)?;
    if !engine.is_unlocked(block) {
      return Err(AppError::BlockLocked(block));
    }
    engine.is_loaded(block)
  };

  if !loaded {
    // fetched lazily when the block list refresh failed for this block
    match state.api.tasks_for_block(block).await {
      Ok(tasks) => lock(&state.engine)?.apply_block_tasks(block, tasks),
      Err(e) => tracing::warn!("Failed to load tasks for block {}: {}", block, e),
    }
  }

  let engine = lock(&state.engine)?;
  let mut flow = lock(&state.flow)?;
  flow.start_block(block, engine.tasks(block), engine.index());
  Ok(Json(flow.view()))
}
