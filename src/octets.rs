//! Order-preserving octet-string mapper.
//!
//! Same `INIT -> NON_LEX | LEX` state machine and finalization structure as
//! `bounded_int`, but the domain is `Vec<u8>` under the standard byte-wise
//! (lexicographic) order, and the codomain is "strings up to a bounded
//! length" rather than a fixed integer interval.

use std::collections::{HashMap, HashSet};

use crate::error::{AnonError, AnonResult};
use crate::key::Key;
use crate::lifecycle::Mode;
use crate::prng::Prng;

/// Minimum length of a synthesized image when the input is shorter than
/// this (spec.md §4.5 leaves the length policy to the implementer;
/// recorded as a decision in DESIGN.md).
const MIN_IMAGE_LEN: usize = 16;

/// Order-preserving injection on the domain of octet strings.
pub struct OctetStringMapper {
    mode: Mode,
    prng: Prng,
    used: Vec<Vec<u8>>,
    used_set: HashSet<Vec<u8>>,
    outputs: HashMap<Vec<u8>, Vec<u8>>,
    issued: HashSet<Vec<u8>>,
    lex_table: Option<HashMap<Vec<u8>, Vec<u8>>>,
}

impl OctetStringMapper {
    /// Create a new, unkeyed mapper.
    pub fn new() -> Self {
        Self {
            mode: Mode::Init,
            prng: Prng::from_key(&Key::new()),
            used: Vec::new(),
            used_set: HashSet::new(),
            outputs: HashMap::new(),
            issued: HashSet::new(),
            lex_table: None,
        }
    }

    /// Seed this mapper's PRNG from `key`.
    pub fn set_key(&mut self, key: &Key) {
        self.prng.reseed(key);
    }

    /// Declare `v` as part of the used set. Only legal in `INIT`.
    pub fn set_used(&mut self, v: &[u8]) -> AnonResult<()> {
        self.mode.require_init("set_used")?;
        if self.used_set.insert(v.to_vec()) {
            self.used.push(v.to_vec());
        }
        Ok(())
    }

    fn image_len(&self, input_len: usize) -> usize {
        input_len.max(MIN_IMAGE_LEN)
    }

    fn fresh_image(&mut self, input_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; self.image_len(input_len)];
        self.prng.uniform_bytes(&mut buf);
        buf
    }

    fn draw_unique(&mut self, input_len: usize) -> Vec<u8> {
        loop {
            let candidate = self.fresh_image(input_len);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Non-lex mapping: assign (and cache) a fresh, pairwise-distinct image
    /// on first sight of `v`; idempotent afterward.
    pub fn map(&mut self, v: &[u8]) -> AnonResult<Vec<u8>> {
        self.mode.enter_non_lex()?;
        if let Some(out) = self.outputs.get(v) {
            return Ok(out.clone());
        }
        let out = self.draw_unique(v.len());
        self.outputs.insert(v.to_vec(), out.clone());
        Ok(out)
    }

    /// Lex mapping: on first call, finalizes the used set into a strictly
    /// order-preserving injection; afterward looks up `v`. `v` must have
    /// been declared via `set_used`.
    pub fn map_lex(&mut self, v: &[u8]) -> AnonResult<Vec<u8>> {
        self.mode.enter_lex()?;
        if self.lex_table.is_none() {
            self.finalize_lex();
        }
        self.lex_table
            .as_ref()
            .unwrap()
            .get(v)
            .cloned()
            .ok_or_else(|| {
                AnonError::PreconditionViolation(format!(
                    "map_lex called on {v:?}, which was never marked with set_used"
                ))
            })
    }

    fn finalize_lex(&mut self) {
        let mut sorted_used = self.used.clone();
        sorted_used.sort();

        let mut images = Vec::with_capacity(sorted_used.len());
        for used in &sorted_used {
            images.push(self.draw_unique(used.len()));
        }
        images.sort();

        let table = sorted_used.into_iter().zip(images).collect();
        self.lex_table = Some(table);
    }
}

impl Default for OctetStringMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(passphrase: &str) -> OctetStringMapper {
        let mut m = OctetStringMapper::new();
        let mut key = Key::new();
        key.set_passphrase(passphrase);
        m.set_key(&key);
        m
    }

    #[test]
    fn scenario_6_lex_preserves_byte_order_and_is_deterministic() {
        let run = || {
            let mut m = keyed("scenario-6");
            for s in ["alpha", "beta", "gamma"] {
                m.set_used(s.as_bytes()).unwrap();
            }
            let a = m.map_lex(b"alpha").unwrap();
            let b = m.map_lex(b"beta").unwrap();
            let g = m.map_lex(b"gamma").unwrap();
            (a, b, g)
        };
        let (a1, b1, g1) = run();
        assert!(a1 < b1);
        assert!(b1 < g1);

        let (a2, b2, g2) = run();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
        assert_eq!(g1, g2);
    }

    #[test]
    fn non_lex_is_idempotent_and_unique() {
        let mut m = keyed("non-lex");
        let x1 = m.map(b"same").unwrap();
        let x2 = m.map(b"same").unwrap();
        let y = m.map(b"different").unwrap();
        assert_eq!(x1, x2);
        assert_ne!(x1, y);
    }

    #[test]
    fn mode_lock_forbids_crossing() {
        let mut m = keyed("mode-lock");
        m.map(b"a").unwrap();
        assert!(matches!(
            m.map_lex(b"a").unwrap_err(),
            AnonError::PreconditionViolation(_)
        ));
        assert!(matches!(
            m.set_used(b"b").unwrap_err(),
            AnonError::PreconditionViolation(_)
        ));
    }

    #[test]
    fn map_lex_on_unmarked_input_is_a_precondition_violation() {
        let mut m = keyed("unmarked");
        m.set_used(b"alpha").unwrap();
        let err = m.map_lex(b"beta").unwrap_err();
        assert!(matches!(err, AnonError::PreconditionViolation(_)));
    }
}
