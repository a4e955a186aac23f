use serde::Serialize;

use crate::domain::{BlockId, Difficulty, Task};

/// Transient per-task answer state. Reset whenever a task is presented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerSession {
  pub selected: Option<String>,
  pub answered: bool,
  pub correct: bool,
  pub reveal_answer: bool,
  pub options_locked: bool,
}

impl AnswerSession {
  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

/// Result of one answered task, as sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
  pub task_id: String,
  pub block: BlockId,
  pub answer: String,
  pub correct: bool,
}

/// Outcome of grading, shown to the child
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
  pub correct: bool,
  /// Only present when the answer was wrong
  pub correct_answer: Option<String>,
}

/// Task as shown before it is answered (no correct answer)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
  pub id: String,
  pub prompt: String,
  pub points: u32,
  pub options: Vec<String>,
  pub difficulty: Difficulty,
  pub difficulty_color: &'static str,
  pub image: Option<String>,
  pub block: BlockId,
}

impl From<&Task> for TaskView {
  fn from(task: &Task) -> Self {
    Self {
      id: task.id.clone(),
      prompt: task.prompt.clone(),
      points: task.points,
      options: task.options.clone(),
      difficulty: task.difficulty(),
      difficulty_color: task.difficulty_color(),
      image: task.image.clone(),
      block: task.block,
    }
  }
}
