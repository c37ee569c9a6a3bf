//! File-contention analysis: predicts which paths each item will touch
//! and splits dependency waves so overlapping items never run together.

mod hints;
mod refine;

pub use hints::{
    extract_hints, extract_hints_from_text, get_overlapping_paths, overlaps_with, FileHints,
};
pub use refine::{refine, refine_with_hints, ContentionNote, RefinedWave};
