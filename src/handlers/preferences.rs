use axum::{extract::State, Json};

use super::{lock, AppError};
use crate::preferences::{PreferenceFlags, PreferenceUpdate};
use crate::state::AppState;

pub async fn get_preferences(
  State(state): State<AppState>,
) -> Result<Json<PreferenceFlags>, AppError> {
  Ok(Json(lock(&state.preferences)?.flags()))
}

pub async fn update_preferences(
  State(state): State<AppState>,
  Json(update): Json<PreferenceUpdate>,
) -> Result<Json<PreferenceFlags>, AppError> {
  let flags = lock(&state.preferences)?.apply(update);
  tracing::debug!(?flags, "Preferences updated");
  Ok(Json(flags))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::{json, Value};

  use crate::db::KeyValueStore;
  use crate::handlers::test_support::server;
  use crate::preferences::{Preferences, SOUND_PAUSED_KEY};
  use crate::testing::FakeApi;

  #[tokio::test]
  async fn test_update_is_partial_and_persisted() {
    let (server, state) = server(Arc::new(FakeApi::default()), 1);

    let flags: Value = server.get("/preferences").await.json();
    assert_eq!(flags, json!({ "animations_paused": false, "sound_paused": false }));

    let flags: Value = server
      .post("/preferences")
      .json(&json!({ "sound_paused": true }))
      .await
      .json();
    assert_eq!(flags, json!({ "animations_paused": false, "sound_paused": true }));

    assert_eq!(
      state.store.get(SOUND_PAUSED_KEY).unwrap().as_deref(),
      Some("true")
    );
    // a fresh session sees the stored value
    assert!(Preferences::load(state.store.clone()).sound_paused());
  }
}
