pub mod worktree;

pub use worktree::WorktreeProvider;
