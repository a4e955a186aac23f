//! Application state shared by all handlers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::RemoteApi;
use crate::db::KeyValueStore;
use crate::engine::ProgressEngine;
use crate::flow::AnswerFlow;
use crate::preferences::Preferences;

/// One learner's session. The mutexes are only held for synchronous updates,
/// never across a request to the remote API.
#[derive(Clone)]
pub struct AppState {
  pub engine: Arc<Mutex<ProgressEngine>>,
  pub flow: Arc<Mutex<AnswerFlow>>,
  pub preferences: Arc<Mutex<Preferences>>,
  pub store: Arc<dyn KeyValueStore>,
  pub api: Arc<dyn RemoteApi>,
  /// Pause between locking a selection and revealing the verdict
  pub grading_delay: Duration,
}

impl AppState {
  pub fn new(
    engine: ProgressEngine,
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn RemoteApi>,
    grading_delay: Duration,
  ) -> Self {
    let preferences = Preferences::load(store.clone());
    Self {
      engine: Arc::new(Mutex::new(engine)),
      flow: Arc::new(Mutex::new(AnswerFlow::new())),
      preferences: Arc::new(Mutex::new(preferences)),
      store,
      api,
      grading_delay,
    }
  }

  pub fn user_id(&self) -> String {
    self
      .engine
      .lock()
      .map(|e| e.user_id().to_string())
      .unwrap_or_default()
  }
}
