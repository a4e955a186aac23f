//! Answer verification flow: present a task, lock in a selection, grade it,
//! reveal the verdict, then submit and move on.
//!
//! ```text
//! Idle -> Presenting -> Grading -> Revealed -> Submitting -> Presenting
//!                                                         -> BlockComplete
//!                                                         -> Idle
//! ```
//!
//! Submission is split in two so the caller never holds the flow across a
//! network call: `begin_continue` locks the flow synchronously and hands out
//! the payload, `complete_continue` applies whatever the server said (or
//! didn't say).

pub mod session;

use std::collections::VecDeque;

use serde::Serialize;

pub use session::{AnswerSession, Submission, TaskView, Verdict};

use crate::domain::{BlockId, SubmitResponse, Task};
use crate::progress::ProgressIndex;
use crate::validation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
  #[default]
  Idle,
  Presenting,
  Grading,
  Revealed,
  Submitting,
  BlockComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
  #[error("cannot {action} while {state:?}")]
  InvalidState {
    action: &'static str,
    state: FlowState,
  },
  #[error("options are locked")]
  OptionsLocked,
  #[error("{0:?} is not one of the task's options")]
  UnknownOption(String),
}

/// Ticket for an in-flight submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
  generation: u64,
  pub submission: Submission,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
  Accepted(SubmitResponse),
  Failed(String),
}

#[derive(Debug, Default)]
pub struct AnswerFlow {
  state: FlowState,
  block: Option<BlockId>,
  current: Option<Task>,
  queue: VecDeque<Task>,
  session: AnswerSession,
  consecutive_errors: u32,
  generation: u64,
  unsynced: Vec<Submission>,
}

impl AnswerFlow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> FlowState {
    self.state
  }

  pub fn block(&self) -> Option<BlockId> {
    self.block
  }

  pub fn current_task(&self) -> Option<&Task> {
    self.current.as_ref()
  }

  pub fn session(&self) -> &AnswerSession {
    &self.session
  }

  pub fn consecutive_errors(&self) -> u32 {
    self.consecutive_errors
  }

  pub fn remaining(&self) -> usize {
    self.queue.len()
  }

  /// Submissions the server never confirmed
  pub fn unsynced(&self) -> &[Submission] {
    &self.unsynced
  }

  pub fn take_unsynced(&mut self) -> Vec<Submission> {
    std::mem::take(&mut self.unsynced)
  }

  pub fn requeue_unsynced(&mut self, submissions: Vec<Submission>) {
    self.unsynced.extend(submissions);
  }

  /// Enter a block, queueing its tasks that are not yet completed.
  pub fn start_block(&mut self, block: BlockId, tasks: &[Task], index: &ProgressIndex) -> FlowState {
    self.generation += 1;
    self.block = Some(block);
    self.current = None;
    self.queue = tasks
      .iter()
      .filter(|t| !index.is_completed(&t.id))
      .cloned()
      .collect();

    tracing::info!(block, pending = self.queue.len(), "Starting block");
    self.advance_locally()
  }

  /// Leave the block list view. Any in-flight submission becomes stale.
  pub fn exit(&mut self) {
    self.generation += 1;
    self.state = FlowState::Idle;
    self.block = None;
    self.current = None;
    self.queue.clear();
    self.session.reset();
  }

  fn present(&mut self, task: Task) -> FlowState {
    self.queue.retain(|t| t.id != task.id);
    self.session.reset();
    self.current = Some(task);
    self.state = FlowState::Presenting;
    self.state
  }

  fn advance_locally(&mut self) -> FlowState {
    match self.queue.pop_front() {
      Some(task) => self.present(task),
      None => self.finish_block(),
    }
  }

  fn finish_block(&mut self) -> FlowState {
    self.session.reset();
    self.current = None;
    self.state = FlowState::BlockComplete;
    tracing::info!(block = ?self.block, "Block complete");
    self.state
  }

  fn finish_all(&mut self) -> FlowState {
    self.session.reset();
    self.block = None;
    self.current = None;
    self.queue.clear();
    self.state = FlowState::Idle;
    self.state
  }

  /// Lock in an option. Only one selection per task is ever accepted.
  pub fn select(&mut self, option: &str) -> Result<FlowState, FlowError> {
    if self.session.options_locked {
      tracing::debug!("Ignoring selection while options are locked");
      return Err(FlowError::OptionsLocked);
    }
    if self.state != FlowState::Presenting {
      return Err(FlowError::InvalidState {
        action: "select",
        state: self.state,
      });
    }
    let task = self.current.as_ref().ok_or(FlowError::InvalidState {
      action: "select",
      state: self.state,
    })?;
    if !task.options.iter().any(|o| o == option) {
      return Err(FlowError::UnknownOption(option.to_string()));
    }

    self.session.selected = Some(option.to_string());
    self.session.options_locked = true;
    self.state = FlowState::Grading;
    Ok(self.state)
  }

  /// Compute the verdict for the locked selection. Runs once per task.
  pub fn finish_grading(&mut self) -> Result<Verdict, FlowError> {
    if self.state != FlowState::Grading {
      return Err(FlowError::InvalidState {
        action: "grade",
        state: self.state,
      });
    }
    let (Some(task), Some(selected)) = (self.current.as_ref(), self.session.selected.as_deref())
    else {
      return Err(FlowError::InvalidState {
        action: "grade",
        state: self.state,
      });
    };

    let correct = validation::grade(selected, task.correct_answer.as_deref());
    let correct_answer = if correct {
      None
    } else {
      Some(task.correct_answer.clone().unwrap_or_default())
    };

    self.session.answered = true;
    self.session.correct = correct;
    self.session.reveal_answer = !correct;
    if correct {
      self.consecutive_errors = 0;
    } else {
      self.consecutive_errors += 1;
    }
    self.state = FlowState::Revealed;

    tracing::debug!(task_id = %task.id, correct, "Answer graded");
    Ok(Verdict {
      correct,
      correct_answer,
    })
  }

  /// Start continuing past a revealed task. The flow is locked until
  /// `complete_continue` is called with the returned ticket.
  pub fn begin_continue(&mut self) -> Result<PendingSubmission, FlowError> {
    if self.state != FlowState::Revealed {
      return Err(FlowError::InvalidState {
        action: "continue",
        state: self.state,
      });
    }
    let (Some(task), Some(block)) = (self.current.as_ref(), self.block) else {
      return Err(FlowError::InvalidState {
        action: "continue",
        state: self.state,
      });
    };

    let submission = Submission {
      task_id: task.id.clone(),
      block,
      answer: self.session.selected.clone().unwrap_or_default(),
      correct: self.session.correct,
    };
    self.state = FlowState::Submitting;
    Ok(PendingSubmission {
      generation: self.generation,
      submission,
    })
  }

  /// Apply the server's answer to a submission and move to the next state.
  ///
  /// A failed submission is kept in `unsynced` and the flow advances through
  /// the local queue anyway. Tickets from before an `exit` or `start_block`
  /// are ignored.
  pub fn complete_continue(&mut self, pending: PendingSubmission, outcome: SubmitOutcome) -> FlowState {
    if pending.generation != self.generation || self.state != FlowState::Submitting {
      tracing::debug!(
        task_id = %pending.submission.task_id,
        "Discarding stale submission result"
      );
      if let SubmitOutcome::Failed(_) = outcome {
        self.unsynced.push(pending.submission);
      }
      return self.state;
    }

    match outcome {
      SubmitOutcome::Accepted(response) => match response.next_task {
        Some(next) => self.present(next),
        None if response.block_complete => self.finish_block(),
        None => self.finish_all(),
      },
      SubmitOutcome::Failed(reason) => {
        tracing::warn!(
          task_id = %pending.submission.task_id,
          "Answer submission failed, continuing locally: {}",
          reason
        );
        self.unsynced.push(pending.submission);
        self.advance_locally()
      }
    }
  }

  pub fn view(&self) -> FlowView {
    FlowView {
      state: self.state,
      block: self.block,
      task: self.current.as_ref().map(TaskView::from),
      session: self.session.clone(),
      revealed_answer: self
        .current
        .as_ref()
        .filter(|_| self.session.reveal_answer)
        .map(|t| t.correct_answer.clone().unwrap_or_default()),
      consecutive_errors: self.consecutive_errors,
      remaining: self.queue.len(),
      unsynced: self.unsynced.len(),
    }
  }
}

/// Snapshot of the flow for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowView {
  pub state: FlowState,
  pub block: Option<BlockId>,
  pub task: Option<TaskView>,
  pub session: AnswerSession,
  pub revealed_answer: Option<String>,
  pub consecutive_errors: u32,
  pub remaining: usize,
  pub unsynced: usize,
}
