//! Progress engine: owns everything fetched from the server and the state
//! derived from it.
//!
//! Inputs arrive independently and in any order (one task list per block,
//! the progress list, the score summary). Each `apply_*` call stores one input
//! and recomputes the unlocked set from scratch. Fetching is kept apart from
//! applying so callers never hold the engine across a network call.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;

use crate::api::{AchievementChecker, ProgressSource, SubmissionSink, TaskSource};
use crate::db::{KeyValueStore, LogOnError};
use crate::domain::{Achievement, BlockId, ProgressRecord, Summary, Task};
use crate::flow::Submission;
use crate::ledger::{self, LedgerError, PointsLedger};
use crate::progress::{self, BlockProgress, ProgressIndex};

pub struct ProgressEngine {
  user_id: String,
  blocks: Vec<BlockId>,
  tasks: BTreeMap<BlockId, Vec<Task>>,
  index: ProgressIndex,
  ledger: PointsLedger,
  unlocked: BTreeSet<BlockId>,
}

impl ProgressEngine {
  /// Create an engine for blocks `1..=block_count`.
  pub fn new(user_id: impl Into<String>, block_count: BlockId) -> Self {
    let blocks: Vec<BlockId> = (1..=block_count.max(1)).collect();
    let mut engine = Self {
      user_id: user_id.into(),
      blocks,
      tasks: BTreeMap::new(),
      index: ProgressIndex::default(),
      ledger: PointsLedger::default(),
      unlocked: BTreeSet::new(),
    };
    engine.recompute();
    engine
  }

  pub fn user_id(&self) -> &str {
    &self.user_id
  }

  pub fn blocks(&self) -> &[BlockId] {
    &self.blocks
  }

  pub fn index(&self) -> &ProgressIndex {
    &self.index
  }

  pub fn tasks(&self, block: BlockId) -> &[Task] {
    self.tasks.get(&block).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn is_loaded(&self, block: BlockId) -> bool {
    self.tasks.contains_key(&block)
  }

  pub fn unlocked_blocks(&self) -> &BTreeSet<BlockId> {
    &self.unlocked
  }

  pub fn is_unlocked(&self, block: BlockId) -> bool {
    self.unlocked.contains(&block)
  }

  pub fn ledger(&self) -> PointsLedger {
    self.ledger
  }

  fn recompute(&mut self) {
    let unlocked = progress::compute_unlocked_blocks(&self.blocks, &self.tasks, &self.index);
    for block in unlocked.difference(&self.unlocked) {
      tracing::info!(block, user_id = %self.user_id, "Block unlocked");
    }
    self.unlocked = unlocked;
  }

  // ==================== Inputs ====================

  pub fn apply_block_tasks(&mut self, block: BlockId, tasks: Vec<Task>) {
    if !self.blocks.contains(&block) {
      tracing::warn!("Ignoring tasks for unknown block {}", block);
      return;
    }
    tracing::debug!(block, count = tasks.len(), "Block tasks loaded");
    self.tasks.insert(block, tasks);
    self.recompute();
  }

  /// Replace the progress index with one built from the full record list.
  pub fn apply_progress(&mut self, records: &[ProgressRecord]) {
    self.index = ProgressIndex::build(records);
    tracing::debug!(completed = self.index.len(), "Progress index rebuilt");
    self.recompute();
  }

  pub fn apply_summary(&mut self, summary: Summary) {
    self.ledger.earned = summary.total_score;
  }

  pub fn reload_spent(&mut self, store: &dyn KeyValueStore) {
    self.ledger.spent = ledger::load_spent(store, &self.user_id);
  }

  /// Apply everything a refresh managed to fetch. Failed inputs keep their
  /// previous (possibly empty) value.
  pub fn apply_fetch(&mut self, fetch: Fetched) -> RefreshReport {
    let mut report = RefreshReport::default();

    for (block, result) in fetch.blocks {
      match result {
        Some(tasks) => self.apply_block_tasks(block, tasks),
        None => report.failed_blocks.push(block),
      }
    }
    if let Some(records) = fetch.progress {
      self.apply_progress(&records);
      report.progress_loaded = true;
    }
    if let Some(summary) = fetch.summary {
      self.apply_summary(summary);
      report.summary_loaded = true;
    }
    report
  }

  // ==================== Derived views ====================

  pub fn block_progress(&self) -> Vec<BlockProgress> {
    self
      .blocks
      .iter()
      .map(|&block| {
        let tasks = self.tasks(block);
        BlockProgress {
          block,
          total: tasks.len(),
          completed: progress::count_completed(tasks, &self.index),
          is_unlocked: self.is_unlocked(block),
          is_loaded: self.is_loaded(block),
        }
      })
      .collect()
  }

  pub fn spend(&mut self, store: &dyn KeyValueStore, amount: u64) -> Result<u64, LedgerError> {
    let user_id = self.user_id.clone();
    self.ledger.spend(store, &user_id, amount)
  }
}

// ==================== Fetching ====================

/// Results of one refresh round. `None` marks an input that failed to load.
#[derive(Debug, Default)]
pub struct Fetched {
  pub blocks: Vec<(BlockId, Option<Vec<Task>>)>,
  pub progress: Option<Vec<ProgressRecord>>,
  pub summary: Option<Summary>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RefreshReport {
  pub progress_loaded: bool,
  pub summary_loaded: bool,
  pub failed_blocks: Vec<BlockId>,
}

impl RefreshReport {
  /// The whole progress screen is unusable without the progress list.
  pub fn needs_alert(&self) -> bool {
    !self.progress_loaded
  }
}

pub async fn fetch_progress<P>(api: &P, user_id: &str) -> Option<Vec<ProgressRecord>>
where
  P: ProgressSource + ?Sized,
{
  api
    .progress_for_user(user_id)
    .await
    .log_warn("Failed to load progress")
}

/// Fetch progress, summary and every block's task list concurrently.
/// Failures are logged and reported as missing inputs; nothing here aborts
/// the refresh.
pub async fn fetch_all<A>(api: &A, user_id: &str, blocks: &[BlockId]) -> Fetched
where
  A: TaskSource + ProgressSource + ?Sized,
{
  let block_fetches = blocks.iter().map(|&block| async move {
    let tasks = api
      .tasks_for_block(block)
      .await
      .log_warn(&format!("Failed to load tasks for block {}", block));
    (block, tasks)
  });

  let (progress, summary, blocks) = tokio::join!(
    fetch_progress(api, user_id),
    async {
      api
        .summary_for_user(user_id)
        .await
        .log_warn("Failed to load score summary")
    },
    join_all(block_fetches)
  );

  Fetched {
    blocks,
    progress,
    summary,
  }
}

/// Ask the server which achievements the latest progress unlocked.
pub async fn check_achievements<C>(checker: &C, user_id: &str) -> Vec<Achievement>
where
  C: AchievementChecker + ?Sized,
{
  let unlocked = checker
    .verify_achievements(user_id)
    .await
    .log_warn_default("Achievement check failed");
  for achievement in &unlocked {
    tracing::info!(user_id, achievement = %achievement.name, "Achievement unlocked");
  }
  unlocked
}

/// Send previously failed submissions again. Returns the ones that still failed.
pub async fn resend_unsynced<S>(sink: &S, submissions: Vec<Submission>) -> Vec<Submission>
where
  S: SubmissionSink + ?Sized,
{
  let mut still_failing = Vec::new();
  for submission in submissions {
    match sink.submit_answer(&submission).await {
      Ok(_) => tracing::info!(task_id = %submission.task_id, "Unsynced answer delivered"),
      Err(e) => {
        tracing::warn!(task_id = %submission.task_id, "Resend failed: {}", e);
        still_failing.push(submission);
      }
    }
  }
  still_failing
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{record, sample_task, FakeApi, MemoryStore};

  fn engine_with_blocks() -> ProgressEngine {
    let mut engine = ProgressEngine::new("u1", 3);
    engine.apply_block_tasks(1, vec![sample_task("a1", 1), sample_task("a2", 1), sample_task("a3", 1)]);
    engine.apply_block_tasks(2, vec![sample_task("b1", 2), sample_task("b2", 2)]);
    engine
  }

  #[test]
  fn test_new_engine_only_first_block_unlocked() {
    let engine = ProgressEngine::new("u1", 4);
    assert_eq!(engine.blocks(), &[1, 2, 3, 4]);
    assert_eq!(engine.unlocked_blocks(), &BTreeSet::from([1]));
    assert!(!engine.is_loaded(1));
  }

  #[test]
  fn test_two_of_three_keeps_block_two_locked() {
    let mut engine = engine_with_blocks();
    engine.apply_progress(&[record("a1"), record("a2")]);

    let progress = engine.block_progress();
    assert_eq!(progress[0].completed, 2);
    assert!((progress[0].ratio() - 2.0 / 3.0).abs() < 1e-9);
    assert!(!engine.is_unlocked(2));
  }

  #[test]
  fn test_full_block_unlocks_next() {
    let mut engine = engine_with_blocks();
    engine.apply_progress(&[record("a1"), record("a2"), record("a3")]);

    assert!(engine.is_unlocked(2));
    assert!(!engine.is_unlocked(3));
    assert_eq!(engine.block_progress()[0].percentage(), 100);
  }

  #[test]
  fn test_progress_before_tasks_still_unlocks() {
    let mut engine = ProgressEngine::new("u1", 2);
    engine.apply_progress(&[record("a1")]);
    assert!(!engine.is_unlocked(2));

    engine.apply_block_tasks(1, vec![sample_task("a1", 1)]);
    assert!(engine.is_unlocked(2));
  }

  #[test]
  fn test_shrinking_progress_relocks() {
    let mut engine = engine_with_blocks();
    engine.apply_progress(&[record("a1"), record("a2"), record("a3")]);
    assert!(engine.is_unlocked(2));

    engine.apply_progress(&[record("a1")]);
    assert!(!engine.is_unlocked(2));
  }

  #[test]
  fn test_unknown_block_is_ignored() {
    let mut engine = ProgressEngine::new("u1", 2);
    engine.apply_block_tasks(9, vec![sample_task("z", 9)]);
    assert!(!engine.is_loaded(9));
    assert_eq!(engine.block_progress().len(), 2);
  }

  #[test]
  fn test_points_from_summary_and_store() {
    let store = MemoryStore::default();
    ledger::set_spent(&store, "u1", 20);

    let mut engine = ProgressEngine::new("u1", 1);
    engine.apply_summary(Summary { total_score: 50 });
    engine.reload_spent(&store);
    assert_eq!(engine.ledger().available(), 30);

    ledger::set_spent(&store, "u1", 70);
    engine.reload_spent(&store);
    assert_eq!(engine.ledger().available(), 0);
  }

  #[test]
  fn test_spend_persists() {
    let store = MemoryStore::default();
    let mut engine = ProgressEngine::new("u1", 1);
    engine.apply_summary(Summary { total_score: 40 });

    assert_eq!(engine.spend(&store, 15), Ok(25));
    assert_eq!(ledger::load_spent(&store, "u1"), 15);
    assert!(engine.spend(&store, 30).is_err());
  }

  #[tokio::test]
  async fn test_refresh_tolerates_partial_failure() {
    let api = FakeApi::default();
    api.set_block(1, vec![sample_task("a1", 1)]);
    api.fail_block(2);
    api.set_progress(vec![record("a1")]);
    api.set_score(35);

    let mut engine = ProgressEngine::new("u1", 2);
    let fetched = fetch_all(&api, "u1", engine.blocks()).await;
    let report = engine.apply_fetch(fetched);

    assert!(report.progress_loaded);
    assert!(report.summary_loaded);
    assert_eq!(report.failed_blocks, vec![2]);
    assert!(!report.needs_alert());
    assert!(engine.is_unlocked(2));
    assert!(!engine.is_loaded(2));
    assert_eq!(engine.ledger().earned, 35);
  }

  #[tokio::test]
  async fn test_refresh_without_progress_needs_alert() {
    let api = FakeApi::default();
    api.fail_progress();
    api.set_block(1, vec![sample_task("a1", 1)]);

    let mut engine = ProgressEngine::new("u1", 1);
    engine.apply_progress(&[record("a1")]);
    let fetched = fetch_all(&api, "u1", engine.blocks()).await;
    let report = engine.apply_fetch(fetched);

    assert!(report.needs_alert());
    // stale progress is kept
    assert!(engine.index().is_completed("a1"));
  }

  #[tokio::test]
  async fn test_resend_unsynced() {
    let api = FakeApi::default();
    let submission = Submission {
      task_id: "a1".into(),
      block: 1,
      answer: "4".into(),
      correct: true,
    };

    api.fail_submissions(true);
    let left = resend_unsynced(&api, vec![submission.clone()]).await;
    assert_eq!(left, vec![submission.clone()]);

    api.fail_submissions(false);
    let left = resend_unsynced(&api, left).await;
    assert!(left.is_empty());
    assert_eq!(api.submitted(), vec![submission]);
  }

  #[tokio::test]
  async fn test_check_achievements_swallows_errors() {
    let api = FakeApi::default();
    api.set_achievements(vec![Achievement {
      id: "l1".into(),
      name: "Primer bloque".into(),
      description: None,
    }]);
    assert_eq!(check_achievements(&api, "u1").await.len(), 1);

    api.fail_achievements();
    assert!(check_achievements(&api, "u1").await.is_empty());
  }

  /// Every block request waits until all of them are in flight.
  struct RendezvousApi {
    barrier: tokio::sync::Barrier,
  }

  #[async_trait::async_trait]
  impl TaskSource for RendezvousApi {
    async fn tasks_for_block(&self, block: BlockId) -> Result<Vec<Task>, crate::api::ApiError> {
      self.barrier.wait().await;
      Ok(vec![sample_task(&format!("t{}", block), block)])
    }
  }

  #[async_trait::async_trait]
  impl ProgressSource for RendezvousApi {
    async fn progress_for_user(&self, _user_id: &str) -> Result<Vec<ProgressRecord>, crate::api::ApiError> {
      Ok(vec![record("t1")])
    }

    async fn summary_for_user(&self, _user_id: &str) -> Result<Summary, crate::api::ApiError> {
      Ok(Summary { total_score: 10 })
    }
  }

  #[tokio::test]
  async fn test_block_fetches_run_concurrently() {
    let api = RendezvousApi {
      barrier: tokio::sync::Barrier::new(3),
    };
    let fetched = tokio::time::timeout(
      std::time::Duration::from_secs(2),
      fetch_all(&api, "u1", &[1, 2, 3]),
    )
    .await
    .expect("block fetches were issued one at a time");

    let order: Vec<BlockId> = fetched.blocks.iter().map(|(b, _)| *b).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert!(fetched.blocks.iter().all(|(_, tasks)| tasks.is_some()));
    assert!(fetched.progress.is_some());
  }
}
