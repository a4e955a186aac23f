use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::difficulty::{self, Difficulty};

/// Ordered stage number (1..N)
pub type BlockId = u32;

/// A single gradeable question, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(alias = "pregunta")]
  pub prompt: String,
  #[serde(default, alias = "puntos")]
  pub points: u32,
  #[serde(default, alias = "opciones")]
  pub options: Vec<String>,
  #[serde(default, alias = "respuestaCorrecta")]
  pub correct_answer: Option<String>,
  #[serde(default, alias = "dificultad")]
  pub difficulty: Option<String>,
  #[serde(default, alias = "imagen")]
  pub image: Option<String>,
  #[serde(alias = "bloque")]
  pub block: BlockId,
}

impl Task {
  pub fn difficulty(&self) -> Difficulty {
    difficulty::normalize(self.difficulty.as_deref())
  }

  pub fn difficulty_color(&self) -> &'static str {
    difficulty::color_for_label(self.difficulty.as_deref())
  }
}

/// Server-confirmed completion of one task by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(default, alias = "tareaId", alias = "tarea")]
  pub task_id: Option<String>,
  #[serde(default, alias = "fechaCompletado")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default, alias = "correcta")]
  pub correct: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  #[serde(default, alias = "puntajeTotal")]
  pub total_score: u64,
}

/// Server reply to an answer submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
  #[serde(default)]
  pub next_task: Option<Task>,
  #[serde(default)]
  pub block_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
  #[serde(alias = "_id")]
  pub id: String,
  #[serde(alias = "nombre")]
  pub name: String,
  #[serde(default, alias = "descripcion")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCheck {
  #[serde(default, alias = "logrosDesbloqueados")]
  pub unlocked_achievements: Vec<Achievement>,
}
