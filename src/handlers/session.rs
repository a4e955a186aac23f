use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{lock, AppError};
use crate::api::{ProgressSource, SubmissionSink};
use crate::db::LogOnError;
use crate::engine;
use crate::flow::{FlowView, PendingSubmission, SubmitOutcome, Verdict};
use crate::state::AppState;

pub async fn get_session(State(state): State<AppState>) -> Result<Json<FlowView>, AppError> {
  Ok(Json(lock(&state.flow)?.view()))
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
  pub option: String,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
  pub verdict: Verdict,
  pub session: FlowView,
}

/// Lock in an option, wait out the "thinking" pause, then reveal the verdict.
///
/// Everything after the selection runs on its own task, so a client that
/// disconnects mid-pause still leaves the flow in `Revealed`.
pub async fn select_option(
  State(state): State<AppState>,
  Json(request): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, AppError> {
  lock(&state.flow)?.select(&request.option)?;

  let response = tokio::spawn(finish_selection(state)).await??;
  Ok(Json(response))
}

async fn finish_selection(state: AppState) -> Result<SelectResponse, AppError> {
  if !state.grading_delay.is_zero() {
    tokio::time::sleep(state.grading_delay).await;
  }

  let mut flow = lock(&state.flow)?;
  let verdict = flow.finish_grading()?;
  Ok(SelectResponse {
    verdict,
    session: flow.view(),
  })
}

/// Submit the revealed answer and move to whatever comes next.
///
/// The flow is locked before the request goes out, so a second tap gets a
/// conflict instead of a duplicate submission. The UI advances even when the
/// submission fails; the answer is kept as unsynced for the next refresh.
/// The submission runs on its own task and completes even if the client
/// goes away.
pub async fn continue_session(State(state): State<AppState>) -> Result<Json<FlowView>, AppError> {
  let pending = lock(&state.flow)?.begin_continue()?;

  let view = tokio::spawn(submit_and_advance(state, pending)).await??;
  Ok(Json(view))
}

async fn submit_and_advance(state: AppState, pending: PendingSubmission) -> Result<FlowView, AppError> {
  let outcome = match state.api.submit_answer(&pending.submission).await {
    Ok(response) => SubmitOutcome::Accepted(response),
    Err(e) => SubmitOutcome::Failed(e.to_string()),
  };
  let accepted = matches!(outcome, SubmitOutcome::Accepted(_));

  let view = {
    let mut flow = lock(&state.flow)?;
    flow.complete_continue(pending, outcome);
    flow.view()
  };

  if accepted {
    reload_after_submission(&state).await?;
  }

  Ok(view)
}

/// Refresh progress and score after a confirmed answer, then check
/// achievements in the background.
async fn reload_after_submission(state: &AppState) -> Result<(), AppError> {
  let user_id = state.user_id();
  let fetched = engine::Fetched {
    progress: engine::fetch_progress(state.api.as_ref(), &user_id).await,
    summary: state
      .api
      .summary_for_user(&user_id)
      .await
      .log_warn("Failed to reload score summary"),
    blocks: Vec::new(),
  };
  lock(&state.engine)?.apply_fetch(fetched);

  let api = state.api.clone();
  tokio::spawn(async move {
    engine::check_achievements(api.as_ref(), &user_id).await;
  });
  Ok(())
}

pub async fn exit_session(State(state): State<AppState>) -> Result<Json<FlowView>, AppError> {
  let mut flow = lock(&state.flow)?;
  flow.exit();
  Ok(Json(flow.view()))
}
