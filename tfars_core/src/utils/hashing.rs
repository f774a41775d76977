//! Stable short hashes used to derive problem variable ids
use std::hash::{DefaultHasher, Hash, Hasher};

/// Hex digest of a value, identical across runs of the same build
pub(crate) fn hex_digest<T: Hash + ?Sized>(value: &T) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
