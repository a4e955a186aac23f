//! Test doubles shared by unit and handler tests.
//!
//! Provides in-memory stores, a scriptable fake of the remote API and a
//! `TestEnv` that wires a real on-disk settings database in a temporary
//! directory.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::api::{AchievementChecker, ApiError, ProgressSource, SubmissionSink, TaskSource};
use crate::db::{self, DbLockError, DbPool, KeyValueStore, SqliteStore, StoreError};
use crate::domain::{Achievement, BlockId, ProgressRecord, SubmitResponse, Summary, Task};
use crate::flow::Submission;

/// Key-value store kept in memory
#[derive(Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.values.lock().unwrap().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self
      .values
      .lock()
      .unwrap()
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Store whose every call fails
pub struct FailingStore;

impl KeyValueStore for FailingStore {
  fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
    Err(StoreError::Lock(DbLockError))
  }

  fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
    Err(StoreError::Lock(DbLockError))
  }
}

pub fn sample_task(id: &str, block: BlockId) -> Task {
  Task {
    id: id.to_string(),
    prompt: format!("¿Cuánto es {}?", id),
    points: 10,
    options: vec!["3".into(), "4".into(), "5".into()],
    correct_answer: Some("4".into()),
    difficulty: Some("Fácil".into()),
    image: None,
    block,
  }
}

pub fn record(task_id: &str) -> ProgressRecord {
  ProgressRecord {
    id: format!("p-{}", task_id),
    task_id: Some(task_id.to_string()),
    completed_at: None,
    correct: Some(true),
  }
}

fn unavailable() -> ApiError {
  ApiError::Status {
    status: 503,
    body: "unavailable".to_string(),
  }
}

#[derive(Default)]
struct FakeState {
  blocks: HashMap<BlockId, Vec<Task>>,
  failing_blocks: HashSet<BlockId>,
  progress: Vec<ProgressRecord>,
  progress_fails: bool,
  score: u64,
  submit_response: SubmitResponse,
  submissions_fail: bool,
  submit_delay: Duration,
  submitted: Vec<Submission>,
  achievements: Vec<Achievement>,
  achievements_fail: bool,
}

/// Scriptable in-memory stand-in for the RetoMate API.
///
/// Accepted submissions are also added to the progress list, like the real
/// server does.
#[derive(Default)]
pub struct FakeApi {
  state: Mutex<FakeState>,
}

impl FakeApi {
  pub fn set_block(&self, block: BlockId, tasks: Vec<Task>) {
    self.state.lock().unwrap().blocks.insert(block, tasks);
  }

  pub fn fail_block(&self, block: BlockId) {
    self.state.lock().unwrap().failing_blocks.insert(block);
  }

  pub fn set_progress(&self, records: Vec<ProgressRecord>) {
    self.state.lock().unwrap().progress = records;
  }

  pub fn fail_progress(&self) {
    self.state.lock().unwrap().progress_fails = true;
  }

  pub fn set_score(&self, score: u64) {
    self.state.lock().unwrap().score = score;
  }

  pub fn set_submit_response(&self, response: SubmitResponse) {
    self.state.lock().unwrap().submit_response = response;
  }

  pub fn fail_submissions(&self, fail: bool) {
    self.state.lock().unwrap().submissions_fail = fail;
  }

  /// Hold every submission for `delay` before answering
  pub fn set_submit_delay(&self, delay: Duration) {
    self.state.lock().unwrap().submit_delay = delay;
  }

  pub fn submitted(&self) -> Vec<Submission> {
    self.state.lock().unwrap().submitted.clone()
  }

  pub fn set_achievements(&self, achievements: Vec<Achievement>) {
    self.state.lock().unwrap().achievements = achievements;
  }

  pub fn fail_achievements(&self) {
    self.state.lock().unwrap().achievements_fail = true;
  }
}

#[async_trait]
impl TaskSource for FakeApi {
  async fn tasks_for_block(&self, block: BlockId) -> Result<Vec<Task>, ApiError> {
    let state = self.state.lock().unwrap();
    if state.failing_blocks.contains(&block) {
      return Err(unavailable());
    }
    Ok(state.blocks.get(&block).cloned().unwrap_or_default())
  }
}

#[async_trait]
impl ProgressSource for FakeApi {
  async fn progress_for_user(&self, _user_id: &str) -> Result<Vec<ProgressRecord>, ApiError> {
    let state = self.state.lock().unwrap();
    if state.progress_fails {
      return Err(unavailable());
    }
    Ok(state.progress.clone())
  }

  async fn summary_for_user(&self, _user_id: &str) -> Result<Summary, ApiError> {
    Ok(Summary {
      total_score: self.state.lock().unwrap().score,
    })
  }
}

#[async_trait]
impl SubmissionSink for FakeApi {
  async fn submit_answer(&self, submission: &Submission) -> Result<SubmitResponse, ApiError> {
    let delay = self.state.lock().unwrap().submit_delay;
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    let mut state = self.state.lock().unwrap();
    if state.submissions_fail {
      return Err(unavailable());
    }
    state.submitted.push(submission.clone());
    state.progress.push(record(&submission.task_id));
    Ok(state.submit_response.clone())
  }
}

#[async_trait]
impl AchievementChecker for FakeApi {
  async fn verify_achievements(&self, _user_id: &str) -> Result<Vec<Achievement>, ApiError> {
    let state = self.state.lock().unwrap();
    if state.achievements_fail {
      return Err(unavailable());
    }
    Ok(state.achievements.clone())
  }
}

/// Settings database in a temporary directory, removed on drop.
pub struct TestEnv {
  /// Temporary directory (kept alive for database file persistence)
  pub temp: TempDir,
  pub pool: DbPool,
}

impl TestEnv {
  pub fn new() -> rusqlite::Result<Self> {
    let temp =
      TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let pool = db::init_db(&temp.path().join("retomate.db"))?;
    Ok(Self { temp, pool })
  }

  pub fn store(&self) -> SqliteStore {
    SqliteStore::new(self.pool.clone())
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }
}
