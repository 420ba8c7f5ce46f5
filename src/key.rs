//! Join key generation.

use rand::Rng;

/// Produces the short human-shareable codes sessions are joined with.
pub trait KeyGenerator: Send + Sync + 'static {
    fn generate_key(&self) -> String;

    fn is_valid_format(&self, key: &str) -> bool;

    /// Canonical stored form of a user-typed key.
    fn normalize(&self, key: &str) -> String {
        key.trim().to_ascii_uppercase()
    }
}

/// Fixed-length keys drawn uniformly from `A-Z`, e.g. `QXBT`.
#[derive(Debug, Clone)]
pub struct AlphabeticKeyGenerator {
    len: usize,
}

impl AlphabeticKeyGenerator {
    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for AlphabeticKeyGenerator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl KeyGenerator for AlphabeticKeyGenerator {
    fn generate_key(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.len)
            .map(|_| Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())] as char)
            .collect()
    }

    /// Case-insensitive: `abcd` is a valid spelling of `ABCD`.
    fn is_valid_format(&self, key: &str) -> bool {
        let key = key.trim();
        key.len() == self.len && key.chars().all(|c| c.is_ascii_alphabetic())
    }
}
