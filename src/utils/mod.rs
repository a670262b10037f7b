//! Shared utility functions for keel.
//!
//! Currently filesystem helpers only: idempotent directory creation, atomic
//! writes for rendered project files, and recursive single-file search used
//! by the structural validation checks.

pub mod fs;

pub use fs::{atomic_write, ensure_dir, find_file_recursive, safe_write};
