//! Answer grading for multiple-choice tasks.
//!
//! Options are authored as free text, so the comparison is trimmed and
//! case-insensitive. Accents are compared as written: "parís" is not "paris".
//! Difficulty labels do strip accents (see `domain::difficulty`); answers
//! intentionally keep the stricter behavior until product decides otherwise.

/// Normalize an answer for comparison
/// - Trims surrounding whitespace
/// - Converts to lowercase
fn normalize_answer(input: &str) -> String {
  input.trim().to_lowercase()
}

/// Grade a selected option against the task's correct answer.
///
/// A missing correct answer is compared as an empty string, which no
/// selectable option can match after trimming unless it is blank itself.
pub fn grade(selected: &str, correct_answer: Option<&str>) -> bool {
  normalize_answer(selected) == normalize_answer(correct_answer.unwrap_or(""))
}
