//! Order-preserving bounded-integer mapper (`u64`/`i64`).
//!
//! Grounded on `examples/original_source/src/anon-uint64.c`: the same
//! `INIT -> NON_LEX | LEX` state machine, the same "used list" plus
//! "input -> output" table, and the same non-lex strategy of drawing a
//! fresh uniform candidate and resampling on collision. The C original's
//! hand-rolled singly linked list and OpenSSL `LHASH` are replaced with a
//! `Vec` (sorted once, at finalization) and a `HashMap`, per the design
//! notes in `spec.md` §9.
//!
//! One generic mapper serves both `u64` and `i64`: both are `BoundedValue`,
//! widened to `i128` internally so range arithmetic never overflows even at
//! `lower = i64::MIN, upper = i64::MAX`.

use std::collections::{HashMap, HashSet};

use crate::error::{AnonError, AnonResult};
use crate::key::Key;
use crate::lifecycle::Mode;
use crate::prng::Prng;

/// A value usable as the domain of a bounded-integer mapper.
pub trait BoundedValue: Copy + Eq + std::hash::Hash + Ord + std::fmt::Debug {
    /// Widen to `i128` for overflow-free range arithmetic.
    fn to_i128(self) -> i128;
    /// Narrow back from an `i128` known to be in range.
    fn from_i128(v: i128) -> Self;
}

impl BoundedValue for u64 {
    fn to_i128(self) -> i128 {
        self as i128
    }
    fn from_i128(v: i128) -> Self {
        v as u64
    }
}

impl BoundedValue for i64 {
    fn to_i128(self) -> i128 {
        self as i128
    }
    fn from_i128(v: i128) -> Self {
        v as i64
    }
}

/// When the used set exceeds this fraction of the range, switch from
/// resample-on-collision to a reservoir draw (spec.md §9, "Re-draw
/// termination").
const RESERVOIR_THRESHOLD_NUM: u128 = 1;
const RESERVOIR_THRESHOLD_DEN: u128 = 2;

/// Order-preserving injection of observed values into `[lower, upper]`.
pub struct BoundedIntMapper<T: BoundedValue> {
    lower: T,
    upper: T,
    range: u128,
    mode: Mode,
    prng: Prng,
    /// Distinct inputs declared via `set_used`, in insertion order; sorted
    /// once at `LEX` finalization.
    used: Vec<T>,
    used_set: HashSet<T>,
    /// `NON_LEX` cache: input -> assigned output.
    outputs: HashMap<T, T>,
    /// Outputs already handed out, across both modes — guarantees
    /// bijectivity.
    issued: HashSet<T>,
    /// Populated once, on the first `map_lex` call.
    lex_table: Option<HashMap<T, T>>,
}

impl<T: BoundedValue> BoundedIntMapper<T> {
    /// Create a new mapper over `[lower, upper]`. Fails if `lower > upper`.
    pub fn new(lower: T, upper: T) -> AnonResult<Self> {
        if lower > upper {
            return Err(AnonError::PreconditionViolation(format!(
                "lower ({lower:?}) must be <= upper ({upper:?})"
            )));
        }
        let range = (upper.to_i128() - lower.to_i128() + 1) as u128;
        Ok(Self {
            lower,
            upper,
            range,
            mode: Mode::Init,
            prng: Prng::from_key(&Key::new()),
            used: Vec::new(),
            used_set: HashSet::new(),
            outputs: HashMap::new(),
            issued: HashSet::new(),
            lex_table: None,
        })
    }

    /// Seed this mapper's PRNG from `key`. Legal any time before the mapper
    /// commits to a mode's data (in practice: call before the first `map`/
    /// `map_lex`, as spec.md §3 requires).
    pub fn set_key(&mut self, key: &Key) {
        self.prng.reseed(key);
    }

    /// Declare `v` as part of the used set for later `map_lex` calls. Only
    /// legal in `INIT`.
    pub fn set_used(&mut self, v: T) -> AnonResult<()> {
        self.mode.require_init("set_used")?;
        if self.used_set.insert(v) {
            self.used.push(v);
        }
        Ok(())
    }

    /// Sample a value uniformly from `[lower, upper]` as an `i128`.
    fn sample(&mut self) -> i128 {
        let word = self.prng.uniform_u64();
        self.lower.to_i128() + (word as u128 % self.range) as i128
    }

    /// Draw a value from `[lower, upper]` not yet present in `issued`,
    /// resampling on collision (or reservoir-drawing once the used set
    /// fills more than half the range).
    fn draw_unique(&mut self) -> AnonResult<T> {
        if self.issued.len() as u128 >= self.range {
            return Err(AnonError::ResourceExhaustion(format!(
                "range of {} values is exhausted",
                self.range
            )));
        }
        if self.issued.len() as u128 * RESERVOIR_THRESHOLD_DEN
            > self.range * RESERVOIR_THRESHOLD_NUM
        {
            return self.draw_unique_reservoir();
        }
        loop {
            let candidate = T::from_i128(self.sample());
            if self.issued.insert(candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Reservoir-style draw: walk the domain and use partial Fisher–Yates
    /// semantics to land on an unissued value in bounded time, avoiding the
    /// resample loop's degradation as the range fills up.
    fn draw_unique_reservoir(&mut self) -> AnonResult<T> {
        let remaining = self.range - self.issued.len() as u128;
        debug_assert!(remaining > 0);
        let mut skip = self.prng.uniform_u64() as u128 % remaining;
        let mut v = self.lower.to_i128();
        loop {
            let candidate = T::from_i128(v);
            if !self.issued.contains(&candidate) {
                if skip == 0 {
                    self.issued.insert(candidate);
                    return Ok(candidate);
                }
                skip -= 1;
            }
            v += 1;
        }
    }

    /// Non-lex mapping: assign (and cache) a fresh, pairwise-distinct image
    /// on first sight of `v`; idempotent afterward. `set_used` is no longer
    /// legal once this has been called.
    pub fn map(&mut self, v: T) -> AnonResult<T> {
        self.mode.enter_non_lex()?;
        if let Some(out) = self.outputs.get(&v) {
            return Ok(*out);
        }
        let out = self.draw_unique()?;
        self.outputs.insert(v, out);
        Ok(out)
    }

    /// Lex mapping: on first call, finalizes the used set into a strictly
    /// order-preserving injection into `[lower, upper]`; afterward looks up
    /// `v` in that table. `v` must have been declared via `set_used`.
    pub fn map_lex(&mut self, v: T) -> AnonResult<T> {
        self.mode.enter_lex()?;
        if self.lex_table.is_none() {
            self.finalize_lex()?;
        }
        self.lex_table
            .as_ref()
            .unwrap()
            .get(&v)
            .copied()
            .ok_or_else(|| {
                AnonError::PreconditionViolation(format!(
                    "map_lex called on {v:?}, which was never marked with set_used"
                ))
            })
    }

    fn finalize_lex(&mut self) -> AnonResult<()> {
        if (self.used.len() as u128) > self.range {
            return Err(AnonError::ResourceExhaustion(format!(
                "{} used values do not fit in a range of {}",
                self.used.len(),
                self.range
            )));
        }
        let mut sorted_used = self.used.clone();
        sorted_used.sort();

        let mut images = Vec::with_capacity(sorted_used.len());
        for _ in 0..sorted_used.len() {
            images.push(self.draw_unique()?);
        }
        images.sort();

        let table = sorted_used.into_iter().zip(images).collect();
        self.lex_table = Some(table);
        Ok(())
    }

    /// The configured lower bound.
    pub fn lower(&self) -> T {
        self.lower
    }

    /// The configured upper bound.
    pub fn upper(&self) -> T {
        self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(BoundedIntMapper::<u64>::new(10, 5).is_err());
    }

    #[test]
    fn non_lex_is_idempotent_and_in_range() {
        let mut m = BoundedIntMapper::<u64>::new(0, 99).unwrap();
        let mut key = Key::new();
        key.set_passphrase("scenario-3");
        m.set_key(&key);

        let x1 = m.map(5).unwrap();
        let x2 = m.map(5).unwrap();
        let y = m.map(7).unwrap();

        assert_eq!(x1, x2);
        assert_ne!(x1, y);
        assert!((0..=99).contains(&x1));
        assert!((0..=99).contains(&y));
    }

    #[test]
    fn lex_preserves_order_and_bijection() {
        let mut m = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        let mut key = Key::new();
        key.set_passphrase("scenario-4");
        m.set_key(&key);

        for v in [3u64, 8, 1] {
            m.set_used(v).unwrap();
        }

        let a = m.map_lex(1).unwrap();
        let b = m.map_lex(3).unwrap();
        let c = m.map_lex(8).unwrap();

        assert!(a < b);
        assert!(b < c);
        let mut seen = [a, b, c];
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn lex_finalization_is_deterministic_for_same_key() {
        let used = [3u64, 8, 1];
        let build = || {
            let mut m = BoundedIntMapper::<u64>::new(0, 9).unwrap();
            let mut key = Key::new();
            key.set_passphrase("same-key");
            m.set_key(&key);
            for v in used {
                m.set_used(v).unwrap();
            }
            (m.map_lex(3).unwrap(), m.map_lex(8).unwrap(), m.map_lex(1).unwrap())
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn lex_rejects_oversized_used_set() {
        let mut m = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        for v in 0u64..11 {
            m.set_used(v).unwrap();
        }
        let err = m.map_lex(0).unwrap_err();
        assert!(matches!(err, AnonError::ResourceExhaustion(_)));
    }

    #[test]
    fn map_lex_on_unmarked_input_is_a_precondition_violation() {
        let mut m = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        m.set_used(1).unwrap();
        let err = m.map_lex(2).unwrap_err();
        assert!(matches!(err, AnonError::PreconditionViolation(_)));
    }

    #[test]
    fn mode_lock_forbids_crossing() {
        let mut m = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        m.map(1).unwrap();
        assert!(matches!(
            m.map_lex(1).unwrap_err(),
            AnonError::PreconditionViolation(_)
        ));

        let mut m2 = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        m2.set_used(1).unwrap();
        m2.map_lex(1).unwrap();
        assert!(matches!(m2.map(2).unwrap_err(), AnonError::PreconditionViolation(_)));

        let mut m3 = BoundedIntMapper::<u64>::new(0, 9).unwrap();
        m3.map(1).unwrap();
        assert!(matches!(m3.set_used(2).unwrap_err(), AnonError::PreconditionViolation(_)));
    }

    #[test]
    fn signed_range_spanning_i64_extremes_does_not_overflow() {
        let mut m = BoundedIntMapper::<i64>::new(i64::MIN, i64::MAX).unwrap();
        let a = m.map(-1).unwrap();
        let b = m.map(1).unwrap();
        assert_ne!(a, b);
    }
}
