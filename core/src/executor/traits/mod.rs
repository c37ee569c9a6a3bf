pub mod fixer;
pub mod renderer;
pub mod repository;
pub mod workspace;

pub use fixer::*;
pub use renderer::*;
pub use repository::*;
pub use workspace::*;
