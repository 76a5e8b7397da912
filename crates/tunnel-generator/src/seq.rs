use crate::Generator;
use std::sync::atomic::{AtomicU64, Ordering};
use tunnel_core::ShortCode;

/// A deterministic generator producing `prefix` followed by a six digit
/// counter: "wh000000", "wh000001", ...
///
/// Useful in tests that need to know the next short code in advance, and for
/// forcing collisions against an existing record.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Starts counting at `offset` instead of zero.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}
