//! Keyed pseudorandom stream shared by every mapper.
//!
//! Two distinct access patterns are needed:
//!
//! - a **sequential** stream of uniform bytes/u64s for sampling random
//!   images (bounded-int and octet-string mappers), where each call
//!   consumes the next slice of the stream; and
//! - a **path-indexed oracle** for the trie, where the flip bit at a node
//!   must be a pure function of `(Key, path)` and nothing else — no
//!   dependence on call order, so two tries built from the same key and
//!   presented the same addresses in different orders still agree bit for
//!   bit (prefix preservation, spec-tested determinism).
//!
//! Both are built the same way the transcript module derives challenges:
//! domain-separated BLAKE3, with a counter folded in for the sequential
//! stream and the trie path folded in for the oracle.

use crate::key::Key;

const SEQ_DST: &[u8] = b"anonkit.prng.seq.v1";
const BIT_DST: &[u8] = b"anonkit.prng.bit.v1";

/// Keyed stream of uniform randomness, re-seedable from a `Key`.
pub struct Prng {
    key_bytes: Vec<u8>,
    ctr: u64,
}

impl Prng {
    /// Seed a new PRNG from `key`. Determinism requirement: two `Prng`s
    /// built `from_key` on equal keys produce identical `uniform_*` streams
    /// when called the same number of times in the same order.
    pub fn from_key(key: &Key) -> Self {
        Self { key_bytes: key.as_bytes().to_vec(), ctr: 0 }
    }

    /// Re-seed this PRNG in place, resetting the sequential counter.
    pub fn reseed(&mut self, key: &Key) {
        self.key_bytes = key.as_bytes().to_vec();
        self.ctr = 0;
    }

    /// Draw one block of the sequential stream (32 bytes), advancing the
    /// counter.
    fn next_block(&mut self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SEQ_DST);
        hasher.update(&self.key_bytes);
        hasher.update(&self.ctr.to_be_bytes());
        self.ctr = self.ctr.wrapping_add(1);
        *hasher.finalize().as_bytes()
    }

    /// A uniformly random `u64`.
    pub fn uniform_u64(&mut self) -> u64 {
        let block = self.next_block();
        u64::from_le_bytes(block[..8].try_into().unwrap())
    }

    /// A uniformly random byte.
    pub fn uniform_byte(&mut self) -> u8 {
        self.next_block()[0]
    }

    /// Fill `buf` with uniformly random bytes, drawing as many blocks as
    /// needed.
    pub fn uniform_bytes(&mut self, buf: &mut [u8]) {
        let mut filled = 0;
        while filled < buf.len() {
            let block = self.next_block();
            let take = (buf.len() - filled).min(block.len());
            buf[filled..filled + take].copy_from_slice(&block[..take]);
            filled += take;
        }
    }

    /// The path-indexed bit oracle used by the trie: a deterministic
    /// function of `(Key, role, path)` only, independent of call order and
    /// of any other path. `path_bits` holds the address bits packed
    /// MSB-first, `path_len` is the number of significant bits (the prefix
    /// length). `role` domain-separates unrelated uses of the oracle over
    /// the same path (e.g. the trie's per-node flip decision vs. its
    /// per-node lex-swap decision) so they don't collapse onto the same
    /// hash output.
    pub fn bit(&self, role: u8, path_bits: &[u8], path_len: u32) -> u8 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(BIT_DST);
        hasher.update(&self.key_bytes);
        hasher.update(&[role]);
        hasher.update(&path_len.to_be_bytes());
        hasher.update(path_bits);
        let digest = hasher.finalize();
        digest.as_bytes()[0] & 1
    }
}
