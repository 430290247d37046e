//! The two-phase state machine shared by every mapper.
//!
//! `INIT` -> (first `map`) -> `NonLex`, or `INIT` -> (first `map_lex`) ->
//! `Lex`. Transitions are one-way and the two final states are mutually
//! exclusive: once a mapper has committed to one mode, the other is a
//! precondition violation for the rest of its life.

use crate::error::AnonError;

/// Lifecycle state of a mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Freshly constructed or still being populated via `set_used`.
    Init,
    /// `map` has been called at least once; `map_lex`/`set_used` are now
    /// forbidden.
    NonLex,
    /// `map_lex` has been called at least once; `map`/`set_used` are now
    /// forbidden.
    Lex,
}

impl Mode {
    /// Check that `set_used` is legal, i.e. the mapper hasn't started
    /// mapping yet.
    pub fn require_init(self, what: &str) -> Result<(), AnonError> {
        match self {
            Mode::Init => Ok(()),
            Mode::NonLex | Mode::Lex => Err(AnonError::PreconditionViolation(format!(
                "{what} is only legal before the first map/map_lex call (mapper is already {self:?})"
            ))),
        }
    }

    /// Transition on a `map` call, rejecting a prior commitment to `Lex`.
    pub fn enter_non_lex(&mut self) -> Result<(), AnonError> {
        match *self {
            Mode::Init => {
                *self = Mode::NonLex;
                Ok(())
            }
            Mode::NonLex => Ok(()),
            Mode::Lex => Err(AnonError::PreconditionViolation(
                "map() called on a mapper already committed to map_lex()".into(),
            )),
        }
    }

    /// Transition on a `map_lex` call, rejecting a prior commitment to
    /// `NonLex`.
    pub fn enter_lex(&mut self) -> Result<(), AnonError> {
        match *self {
            Mode::Init => {
                *self = Mode::Lex;
                Ok(())
            }
            Mode::Lex => Ok(()),
            Mode::NonLex => Err(AnonError::PreconditionViolation(
                "map_lex() called on a mapper already committed to map()".into(),
            )),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Init
    }
}
