//! Block gating: per-block completion ratio and the derived unlocked set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::ProgressIndex;
use crate::domain::{BlockId, Task};

/// Block that is always open
pub const FIRST_BLOCK: BlockId = 1;

/// Progress information for a block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockProgress {
  pub block: BlockId,
  pub total: usize,
  pub completed: usize,
  pub is_unlocked: bool,
  /// False until the block's task list has arrived at least once
  pub is_loaded: bool,
}

impl BlockProgress {
  pub fn ratio(&self) -> f64 {
    ratio(self.completed, self.total)
  }

  pub fn percentage(&self) -> u8 {
    if self.total > 0 {
      ((self.completed.min(self.total) * 100) / self.total) as u8
    } else {
      0
    }
  }

  pub fn is_complete(&self) -> bool {
    self.ratio() >= 1.0
  }
}

fn ratio(completed: usize, total: usize) -> f64 {
  if total == 0 {
    return 0.0;
  }
  completed as f64 / total as f64
}

/// Number of tasks in the slice the index marks completed
pub fn count_completed(tasks: &[Task], index: &ProgressIndex) -> usize {
  tasks.iter().filter(|t| index.is_completed(&t.id)).count()
}

/// Completion ratio in [0, 1]. A block with no tasks is at 0.
pub fn compute_block_progress(tasks: &[Task], index: &ProgressIndex) -> f64 {
  ratio(count_completed(tasks, index), tasks.len())
}

/// Derive the unlocked set.
///
/// Block 1 is always unlocked. Block k+1 is unlocked when block k is fully
/// completed and k+1 is one of the configured blocks. A block with no tasks
/// (empty or not loaded yet) has ratio 0 and never opens its successor.
pub fn compute_unlocked_blocks(
  blocks: &[BlockId],
  tasks_by_block: &BTreeMap<BlockId, Vec<Task>>,
  index: &ProgressIndex,
) -> BTreeSet<BlockId> {
  let ordered: BTreeSet<BlockId> = blocks.iter().copied().collect();
  let mut unlocked = BTreeSet::new();
  unlocked.insert(FIRST_BLOCK);

  for &block in &ordered {
    let tasks = tasks_by_block.get(&block).map(Vec::as_slice).unwrap_or(&[]);
    if compute_block_progress(tasks, index) < 1.0 {
      continue;
    }
    if let Some(next) = block.checked_add(1).filter(|n| ordered.contains(n)) {
      unlocked.insert(next);
    }
  }

  unlocked
}
