//! Difficulty label normalization and display colors.
//!
//! Task authors write difficulty as free text ("Fácil", "DIFICIL", "medium"),
//! so labels are folded to one of three canonical values before display.

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Color used for labels outside the known difficulties
pub const FALLBACK_COLOR: &str = "#9E9E9E";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  /// Parse an already-normalized or raw label. Returns None for unknown labels.
  pub fn parse(label: &str) -> Option<Self> {
    match normalize_label(label).as_str() {
      "easy" | "facil" => Some(Self::Easy),
      "medium" | "medio" | "media" | "intermedio" => Some(Self::Medium),
      "hard" | "dificil" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }
}

/// Lower-case, trim and strip accents ("Difícil" -> "dificil").
///
/// Unknown labels pass through in this folded form.
pub fn normalize_label(label: &str) -> String {
  label
    .trim()
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase()
}

/// Resolve a task's difficulty label. Empty, absent and unknown labels are `Easy`.
pub fn normalize(label: Option<&str>) -> Difficulty {
  label.and_then(Difficulty::parse).unwrap_or(Difficulty::Easy)
}

pub fn color_for(difficulty: Difficulty) -> &'static str {
  match difficulty {
    Difficulty::Easy => "#4CAF50",
    Difficulty::Medium => "#FF9800",
    Difficulty::Hard => "#F44336",
  }
}

/// Color for a raw label, falling back for labels that are not a known difficulty.
///
/// An absent or blank label is displayed as `Easy`.
pub fn color_for_label(label: Option<&str>) -> &'static str {
  match label.map(normalize_label) {
    None => color_for(Difficulty::Easy),
    Some(folded) if folded.is_empty() => color_for(Difficulty::Easy),
    Some(folded) => Difficulty::parse(&folded)
      .map(color_for)
      .unwrap_or(FALLBACK_COLOR),
  }
}
