use crate::Generator;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tunnel_core::ShortCode;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// The symbols a random string is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    /// Mixed-case letters and digits, 62 symbols.
    #[default]
    Alphanumeric,
    /// Lowercase letters only, used for test fixtures.
    Lowercase,
}

impl Alphabet {
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Alphanumeric => ALPHANUMERIC,
            Alphabet::Lowercase => LOWERCASE,
        }
    }
}

/// Returns `length` symbols drawn uniformly from `alphabet`, using the
/// calling thread's generator.
pub fn generate(length: usize, alphabet: Alphabet) -> String {
    sample(&mut rand::rng(), length, alphabet)
}

fn sample<R: Rng + ?Sized>(rng: &mut R, length: usize, alphabet: Alphabet) -> String {
    let symbols = alphabet.symbols();
    (0..length)
        .map(|_| symbols[rng.random_range(0..symbols.len())] as char)
        .collect()
}

/// A short code generator owning its own random source.
///
/// The source sits behind a mutex, so one instance can be shared by every
/// request handler. Tests build it with [`RandomGenerator::seeded`] to get a
/// reproducible sequence.
#[derive(Debug)]
pub struct RandomGenerator {
    length: usize,
    alphabet: Alphabet,
    rng: Mutex<StdRng>,
}

impl RandomGenerator {
    /// Creates an alphanumeric generator seeded from the operating system.
    pub fn new(length: usize) -> Self {
        Self::with_alphabet(length, Alphabet::Alphanumeric)
    }

    pub fn with_alphabet(length: usize, alphabet: Alphabet) -> Self {
        Self {
            length,
            alphabet,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a deterministic generator.
    pub fn seeded(length: usize, alphabet: Alphabet, seed: u64) -> Self {
        Self {
            length,
            alphabet,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Draws the next random string.
    pub fn next_string(&self) -> String {
        let mut rng = self.rng.lock();
        sample(&mut *rng, self.length, self.alphabet)
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        ShortCode::new_unchecked(self.next_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn produces_exact_length_from_alphabet() {
        for alphabet in [Alphabet::Alphanumeric, Alphabet::Lowercase] {
            let s = generate(8, alphabet);
            assert_eq!(s.len(), 8);
            assert!(s.bytes().all(|b| alphabet.symbols().contains(&b)));
        }
    }

    #[test]
    fn zero_length_is_empty() {
        assert_eq!(generate(0, Alphabet::Alphanumeric), "");
    }

    #[test]
    fn generated_codes_are_valid_short_codes() {
        let generator = RandomGenerator::new(8);
        let code = generator.generate();
        assert!(ShortCode::new(code.as_str()).is_ok());
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let a = RandomGenerator::seeded(8, Alphabet::Alphanumeric, 42);
        let b = RandomGenerator::seeded(8, Alphabet::Alphanumeric, 42);

        for _ in 0..10 {
            assert_eq!(a.next_string(), b.next_string());
        }
    }

    #[test]
    fn no_collisions_in_a_short_window() {
        let generator = RandomGenerator::new(8);
        let codes: HashSet<String> = (0..10_000).map(|_| generator.next_string()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn shared_across_threads() {
        let generator = Arc::new(RandomGenerator::new(8));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| generator.next_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for code in handle.join().unwrap() {
                assert_eq!(code.len(), 8);
                all.insert(code);
            }
        }
        assert_eq!(all.len(), 1000);
    }
}
