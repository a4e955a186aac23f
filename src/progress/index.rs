//! Completed-task membership built from the user's progress records.

use std::collections::HashSet;

use crate::domain::ProgressRecord;

/// Set of task ids the server has confirmed as completed.
///
/// There is deliberately no way to insert a single id: the index is rebuilt
/// from the full progress list every time it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndex {
  completed: HashSet<String>,
}

impl ProgressIndex {
  /// Build the index, skipping records with a missing or blank task reference.
  /// Duplicate records for the same task collapse to one entry.
  pub fn build(records: &[ProgressRecord]) -> Self {
    let completed = records
      .iter()
      .filter_map(|r| r.task_id.as_deref())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .map(str::to_string)
      .collect();
    Self { completed }
  }

  pub fn is_completed(&self, task_id: &str) -> bool {
    self.completed.contains(task_id)
  }

  pub fn len(&self) -> usize {
    self.completed.len()
  }

  pub fn is_empty(&self) -> bool {
    self.completed.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.completed.iter().map(String::as_str)
  }
}
