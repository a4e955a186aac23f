pub mod index;
pub mod unlock;

pub use index::ProgressIndex;
pub use unlock::{
  compute_block_progress, compute_unlocked_blocks, count_completed, BlockProgress, FIRST_BLOCK,
};
