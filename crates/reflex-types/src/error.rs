//! Errors raised while building type descriptors and values

use thiserror::Error;

/// Errors that can occur while declaring types or constructing values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A value of the wrong type was stored into a typed slot
    #[error("cannot use value of type {actual} as {expected}")]
    Mismatch {
        /// Type of the slot
        expected: String,
        /// Type of the offered value
        actual: String,
    },

    /// A constructor was handed a type of the wrong kind
    #[error("expected {expected} type, {actual} given")]
    WrongKind {
        /// Kind the constructor builds
        expected: String,
        /// Type that was given
        actual: String,
    },

    /// Wrong number of struct fields or array elements
    #[error("{ty} expects {expected} elements, {actual} given")]
    Arity {
        /// Type being constructed
        ty: String,
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },

    /// Index past the end of a slice or array
    #[error("index {index} out of range [0:{len}]")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Length of the container
        len: usize,
    },

    /// Write through a nil pointer, slice or map
    #[error("assignment through nil {0}")]
    NilReference(String),

    /// Map key of a type that cannot be compared
    #[error("invalid map key type {0}")]
    UnhashableKey(String),

    /// `define` called twice on the same declared type
    #[error("type {0} is already defined")]
    AlreadyDefined(String),

    /// A type that holds a value of itself inline, through struct fields or array
    /// elements, has no finite size
    #[error("invalid recursive type {0}")]
    CircularType(String),

    /// Methods can only be attached to named types
    #[error("cannot define method {method} on unnamed type {ty}")]
    UnnamedReceiver {
        /// Receiver type
        ty: String,
        /// Method name
        method: String,
    },

    /// Field and method names of a type must be distinct
    #[error("type {ty} has both field and method named {name}")]
    DuplicateMember {
        /// Receiver type
        ty: String,
        /// Conflicting name
        name: String,
    },

    /// Variadic signatures must end with a slice parameter
    #[error("variadic signature must end with a slice parameter")]
    BadVariadic,
}
