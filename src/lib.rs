//! Crate root: public surface and shared primitives.
//!
//! This module is the canonical entry point for downstream users. It
//! re-exports the key, PRNG, and mapper types so `use anonkit::{...}` is
//! enough for the common cases; submodule paths remain available for
//! anything more specific.
//!
//! ## Invariants
//!
//! - **Determinism.** Every mapper's randomness is a pure function of its
//!   `Key` (see `prng`). Two mappers seeded with equal keys and driven with
//!   the same calls in the same order produce identical outputs.
//! - **Two-phase lifecycle.** Every mapper starts in `INIT`. The first call
//!   to `map` commits it to `NON_LEX` for its remaining lifetime; the first
//!   call to `map_lex` commits it to `LEX` instead. Crossing from one to
//!   the other is a `PreconditionViolation`, never a silent coercion.
//! - **Bijectivity.** Within a committed mode, a mapper never issues the
//!   same output for two distinct inputs.
//!
//! These invariants are enforced at runtime by `lifecycle::Mode`; a
//! violation is always a precise `AnonError`, never UB.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Symmetric key used to seed every mapper's PRNG.
pub mod key;
/// Keyed pseudorandom stream shared by every mapper.
pub mod prng;
/// The two-phase state machine shared by every mapper.
pub mod lifecycle;
/// Shared error type for every mapper in this crate.
pub mod error;
/// Order-preserving bounded-integer mapper (`u64`/`i64`).
pub mod bounded_int;
/// Order-preserving octet-string mapper.
pub mod octets;
/// Prefix-preserving (and optionally lex-order-preserving) IP trie.
pub mod trie;
/// MAC address mapper, built on the bounded-integer mapper.
pub mod mac;
/// Textual readers for the CLI.
pub mod parse;

pub use crate::bounded_int::{BoundedIntMapper, BoundedValue};
pub use crate::error::{AnonError, AnonResult};
pub use crate::key::Key;
pub use crate::lifecycle::Mode;
pub use crate::mac::MacMapper;
pub use crate::octets::OctetStringMapper;
pub use crate::prng::Prng;
pub use crate::trie::{IpV4Trie, IpV6Trie, Trie};
