//! Shared error type for every mapper in this crate.
//!
//! One enum instead of a per-module error type: every mapper (trie,
//! bounded-int, octet-string, MAC) fails in the same small number of ways,
//! and callers juggling several mapper kinds at once (the CLI does) want a
//! single `Result` alias to propagate with `?`.

use thiserror::Error;

/// Error kinds surfaced by the core mappers.
///
/// Precondition violations are reported, never silently coerced: crossing
/// mode (`NON_LEX` <-> `LEX`), calling `map_lex` on an input outside the
/// used set, or constructing a bounded mapper with `lower > upper`.
#[derive(Debug, Error)]
pub enum AnonError {
    /// A two-phase lifecycle rule was violated (mode crossing, `set_used`
    /// after the first `map`/`map_lex`, unmarked input to `map_lex`, or an
    /// invalid `[lower, upper]` range).
    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    /// Allocation failure, or the bounded/octet-string mappers ran out of
    /// distinct images to assign.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// A parse or file-I/O error at the CLI collaborator boundary.
    #[error("I/O error: {0}")]
    Io(String),

    /// The system randomness source could not be read.
    #[error("randomness failure: {0}")]
    RandomnessFailure(String),
}

/// Convenience alias used throughout the crate.
pub type AnonResult<T> = Result<T, AnonError>;
