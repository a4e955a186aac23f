pub mod difficulty;
pub mod task;

pub use difficulty::Difficulty;
pub use task::{Achievement, AchievementCheck, BlockId, ProgressRecord, SubmitResponse, Summary, Task};
