//! Path utilities.
//!
//! Pure functions for path manipulation.

pub mod fs;

pub use fs::{normalize_lexical, normalize_path};
