pub mod random;
pub mod seq;

pub use random::{generate, Alphabet, RandomGenerator};
pub use seq::SeqGenerator;

use tunnel_core::ShortCode;

/// Default length of generated short codes.
pub const DEFAULT_LENGTH: usize = 8;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage,
/// and must be safe to call from many tasks at once.
pub trait Generator: Send + Sync + 'static {
    /// Generates the next short code.
    ///
    /// Codes should be unique with negligible collision probability; stores
    /// reject a code already bound to a different origin, so callers may
    /// re-roll.
    fn generate(&self) -> ShortCode;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn generators_are_object_safe() {
        let generators: Vec<Arc<dyn Generator>> = vec![
            Arc::new(RandomGenerator::new(DEFAULT_LENGTH)),
            Arc::new(SeqGenerator::with_prefix("wh")),
        ];

        for generator in generators {
            assert_eq!(generator.generate().as_str().len(), DEFAULT_LENGTH);
        }
    }
}
