//! Error taxonomy for the compilation pipeline.
//!
//! Every fallible operation in this crate returns one of these five kinds.
//! Nothing is retried internally; a caller sees a fatal [`Error`] naming the
//! offending construct.

use thiserror::Error;

/// The single error type returned by every fallible operation in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Ill-formed input text, located at the offending token.
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Lookup of an unregistered name, or registration of a name with a
    /// forbidden leading character.
    #[error("name error: {0}")]
    Name(String),

    /// The graph violates a precondition of the chosen encoding (loop,
    /// duplicate vertex, isolated vertex/edge, duplicate code).
    #[error("structure error: {0}")]
    Structure(String),

    /// An operation required a [`crate::grst::GrSt`] and none was supplied,
    /// or quantifier expansion was attempted with no available domain.
    #[error("context error: {0}")]
    Context(String),

    /// A SAT model conflicted, was incomplete, or decoded to a code absent
    /// from the position map.
    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
