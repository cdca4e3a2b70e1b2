//! Freshness detection: blake3 content fingerprints and the change cache.

mod cache;
mod hash;

pub use cache::ChangeCache;
pub use hash::{ContentHash, hash_file};
