//! Remote RetoMate API collaborators.
//!
//! The engine only talks to these traits; `HttpApi` is the production
//! implementation and tests plug in in-memory fakes.

pub mod http;

use async_trait::async_trait;

pub use http::HttpApi;

use crate::domain::{Achievement, BlockId, ProgressRecord, SubmitResponse, Summary, Task};
use crate::flow::Submission;

/// Errors from the remote API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The HTTP request itself failed (network, DNS, TLS, decoding).
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  /// The API returned a non-2xx status code.
  #[error("API error ({status}): {body}")]
  Status { status: u16, body: String },
}

#[async_trait]
pub trait TaskSource: Send + Sync {
  async fn tasks_for_block(&self, block: BlockId) -> Result<Vec<Task>, ApiError>;
}

#[async_trait]
pub trait ProgressSource: Send + Sync {
  async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressRecord>, ApiError>;
  async fn summary_for_user(&self, user_id: &str) -> Result<Summary, ApiError>;
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
  async fn submit_answer(&self, submission: &Submission) -> Result<SubmitResponse, ApiError>;
}

#[async_trait]
pub trait AchievementChecker: Send + Sync {
  async fn verify_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, ApiError>;
}

/// Every collaborator the engine needs, usually one `HttpApi` behind all four.
pub trait RemoteApi: TaskSource + ProgressSource + SubmissionSink + AchievementChecker {}

impl<T> RemoteApi for T where T: TaskSource + ProgressSource + SubmissionSink + AchievementChecker {}
