//! reqwest client for the RetoMate REST API.
//!
//! Plain JSON over HTTP with a bearer token. The token is obtained and
//! refreshed elsewhere; this client only attaches it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{AchievementChecker, ApiError, ProgressSource, SubmissionSink, TaskSource};
use crate::domain::{
  Achievement, AchievementCheck, BlockId, ProgressRecord, SubmitResponse, Summary, Task,
};
use crate::flow::Submission;

/// HTTP client for one RetoMate API deployment.
pub struct HttpApi {
  client: reqwest::Client,
  base_url: String,
  token: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnswerBody<'a> {
  respuesta: &'a str,
  correcta: bool,
}

/// Percent-encode one path segment so ids cannot change the route.
fn segment(id: &str) -> std::borrow::Cow<'_, str> {
  urlencoding::encode(id)
}

impl HttpApi {
  pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
    Self::with_client(reqwest::Client::new(), base_url, token)
  }

  /// Reuse an existing [`reqwest::Client`] (connection pooling, custom timeouts).
  pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
    Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      token,
    }
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }

  fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let response = self.authorize(self.client.get(self.url(path))).send().await?;
    Self::parse_response(response).await
  }

  async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let response = self
      .authorize(self.client.post(self.url(path)))
      .json(body)
      .send()
      .await?;
    Self::parse_response(response).await
  }

  async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
      let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
      return Err(ApiError::Status {
        status: status.as_u16(),
        body,
      });
    }
    Ok(response.json().await?)
  }
}

#[async_trait]
impl TaskSource for HttpApi {
  async fn tasks_for_block(&self, block: BlockId) -> Result<Vec<Task>, ApiError> {
    self.get_json(&format!("tareas/bloque/{}", block)).await
  }
}

#[async_trait]
impl ProgressSource for HttpApi {
  async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressRecord>, ApiError> {
    self.get_json(&format!("progreso/usuario/{}", segment(user_id))).await
  }

  async fn summary_for_user(&self, user_id: &str) -> Result<Summary, ApiError> {
    self.get_json(&format!("progreso/resumen/{}", segment(user_id))).await
  }
}

#[async_trait]
impl SubmissionSink for HttpApi {
  async fn submit_answer(&self, submission: &Submission) -> Result<SubmitResponse, ApiError> {
    let body = AnswerBody {
      respuesta: &submission.answer,
      correcta: submission.correct,
    };
    self
      .post_json(&format!("tareas/{}/responder", segment(&submission.task_id)), &body)
      .await
  }
}

#[async_trait]
impl AchievementChecker for HttpApi {
  async fn verify_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, ApiError> {
    let body = serde_json::json!({ "userId": user_id });
    let check: AchievementCheck = self.post_json("logros/verificar", &body).await?;
    Ok(check.unlocked_achievements)
  }
}
