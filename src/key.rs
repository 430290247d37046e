//! Symmetric key used to seed every mapper's PRNG.
//!
//! A `Key` is an opaque byte buffer. It is filled either from system
//! randomness or deterministically from a passphrase, so that the same
//! passphrase always reproduces the same key and therefore the same
//! anonymization mapping (see `prng` for how the key actually drives the
//! stream — `set_passphrase` has no observable effect unless every mapper's
//! PRNG is actually seeded from it).

use rand::RngCore;

use crate::error::{AnonError, AnonResult};

/// Default key length in bytes, matching a 256-bit BLAKE3 keyed hash.
pub const DEFAULT_KEY_LEN: usize = 32;

/// Fixed-length symmetric key. Cloning copies the bytes; a clone is
/// independent of the original, so mutating the original after a mapper
/// has called `set_key` never affects that mapper.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    bytes: Vec<u8>,
}

impl Key {
    /// An empty key of `DEFAULT_KEY_LEN` zero bytes.
    pub fn new() -> Self {
        Self { bytes: vec![0u8; DEFAULT_KEY_LEN] }
    }

    /// An empty key of the given length (in bytes).
    pub fn with_len(len: usize) -> Self {
        Self { bytes: vec![0u8; len] }
    }

    /// Fill the key with cryptographically secure randomness, preserving
    /// its current length.
    pub fn set_random(&mut self) -> AnonResult<()> {
        rand::rngs::OsRng
            .try_fill_bytes(&mut self.bytes)
            .map_err(|e| AnonError::RandomnessFailure(e.to_string()))
    }

    /// Derive the key deterministically from `passphrase`.
    ///
    /// Uses a domain-separated BLAKE3 hash, extended to the key's length via
    /// the hasher's XOF — the same "hash then expand" idiom the transcript
    /// module uses to turn a label into field challenges. Same passphrase,
    /// same key, every time.
    pub fn set_passphrase(&mut self, passphrase: &str) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"anonkit.key.v1");
        hasher.update(&(passphrase.len() as u64).to_be_bytes());
        hasher.update(passphrase.as_bytes());
        let mut xof = hasher.finalize_xof();
        xof.fill(&mut self.bytes);
    }

    /// Read-only access to the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in this key.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether this key holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero the key's contents in place. The key remains usable afterward
    /// (same length, all-zero bytes), matching `set_random`/`set_passphrase`
    /// being re-callable on the same object.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passphrase_is_deterministic() {
        let mut k1 = Key::new();
        let mut k2 = Key::new();
        k1.set_passphrase("correct horse battery staple");
        k2.set_passphrase("correct horse battery staple");
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn different_passphrase_differs() {
        let mut k1 = Key::new();
        let mut k2 = Key::new();
        k1.set_passphrase("alpha");
        k2.set_passphrase("beta");
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn clone_is_independent() {
        let mut k1 = Key::new();
        k1.set_passphrase("seed");
        let k2 = k1.clone();
        k1.clear();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn respects_requested_length() {
        let mut k = Key::with_len(16);
        k.set_passphrase("short key");
        assert_eq!(k.len(), 16);
    }
}
