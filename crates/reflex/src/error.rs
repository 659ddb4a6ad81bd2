//! Error types for reflex operations

use std::fmt;

use reflex_types::{error_message, TypeError, Value};
use thiserror::Error;

/// Result type for reflex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the invoker, the coercion engine, the field accessors and the
/// field walker.
///
/// Outer operations wrap inner failures in [`Error::Context`], so the rendered text
/// reads like `cannot call method (*pkg.T)."Name": arg0: cannot convert ...`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The callable is nil
    #[error("invalid func: {0}")]
    InvalidFunc(String),

    /// The callable is not a function
    #[error("expected func, {0} given")]
    NotFunc(String),

    /// A value of an unexpected kind was given
    #[error("expected {expected}, {given} given")]
    UnexpectedKind {
        /// What the operation accepts
        expected: String,
        /// Type of the given value
        given: String,
    },

    /// The method receiver is nil
    #[error("invalid method receiver: {0}")]
    InvalidReceiver(String),

    /// No method of the given name is reachable from the receiver
    #[error("({receiver}).{}: invalid method", quote(.method))]
    InvalidMethod {
        /// Type of the receiver the lookup ended on
        receiver: String,
        /// Requested method
        method: String,
    },

    /// A pointer to an empty interface was given as a receiver
    #[error("invalid object")]
    InvalidObject,

    /// The value is transitively a pointer to itself
    #[error("unexpected pointer loop")]
    PointerLoop,

    /// Fields of a struct passed by value cannot be set
    #[error("pointer is required to set fields")]
    PointerRequired,

    /// The pointer chain ends in a nil pointer to a struct
    #[error("pointer to nil struct given")]
    NilStructPointer,

    /// More arguments than a non-variadic function accepts
    #[error("too many input arguments")]
    TooManyArguments,

    /// Fewer arguments than the function requires
    #[error("not enough input arguments")]
    NotEnoughArguments,

    /// Strict mode: the value's type is not assignable to the target
    #[error("value of type {from} is not assignable to type {to}")]
    NotAssignable {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Conversion mode: no conversion rule applies
    #[error("cannot convert {from} to {to}")]
    NotConvertible {
        /// Source type
        from: String,
        /// Target type
        to: String,
    },

    /// Conversion mode: a conversion rule applied but failed
    #[error("cannot convert {from} to {to}: {source}")]
    Conversion {
        /// Source type
        from: String,
        /// Target type
        to: String,
        /// Why the nested conversion failed
        source: Box<Error>,
    },

    /// The callable does not follow the provider or wither convention
    #[error(transparent)]
    Convention(#[from] ConventionViolation),

    /// The provider ran and returned an error of its own
    #[error("provider returned error: {0}")]
    Provider(ProviderError),

    /// No field of the given name
    #[error("field {} does not exist", quote(.0))]
    FieldNotFound(String),

    /// The blank field cannot be addressed by name
    #[error("\"_\" is not supported")]
    FieldUnsupported,

    /// A value failed a check of the type model
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Inner error with a location prefix
    #[error("{context}: {source}")]
    Context {
        /// Location, e.g. `arg0` or `cannot call func(int)`
        context: String,
        /// Wrapped error
        source: Box<Error>,
    },

    /// Several independent failures, one per line
    #[error("{}", join_lines(.0))]
    Group(Vec<Error>),
}

/// Coarse classification of an [`Error`], looking through prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a function, or a nil function
    InvalidCallable,
    /// A value of an unexpected kind
    UnexpectedKind,
    /// Nil method receiver
    InvalidReceiver,
    /// Method not found
    InvalidMethod,
    /// Pointer to an empty interface
    InvalidObject,
    /// Self-referential pointer
    PointerLoop,
    /// Set through a struct passed by value
    PointerRequired,
    /// Nil pointer to a struct
    NilStructPointer,
    /// Arity: too many arguments
    TooManyArguments,
    /// Arity: not enough arguments
    NotEnoughArguments,
    /// Strict-mode type mismatch
    NotAssignable,
    /// Conversion-mode type mismatch
    NotConvertible,
    /// Provider or wither convention violated
    ConventionViolation,
    /// The provider ran and failed
    ProviderExternalError,
    /// Field not found
    FieldNotFound,
    /// Blank field requested
    FieldUnsupported,
    /// Rejected by the type model
    InvalidValue,
    /// More than one failure
    Multiple,
}

impl Error {
    /// Group several errors; a single error is returned unchanged
    pub fn group(mut errors: Vec<Error>) -> Error {
        if errors.len() == 1 {
            return errors.remove(0);
        }
        Error::Group(errors)
    }

    /// Wrap with a location prefix. Grouped errors get the prefix on every member.
    pub fn prefixed(self, context: impl Into<String>) -> Error {
        let context = context.into();
        match self {
            Error::Group(errors) => Error::Group(
                errors
                    .into_iter()
                    .map(|e| e.prefixed(context.clone()))
                    .collect(),
            ),
            other => Error::Context {
                context,
                source: Box::new(other),
            },
        }
    }

    /// Flatten groups into their members
    pub fn collection(&self) -> Vec<&Error> {
        match self {
            Error::Group(errors) => errors.iter().flat_map(Error::collection).collect(),
            other => vec![other],
        }
    }

    /// Innermost error below any prefixes
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classification of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::InvalidFunc(_) | Error::NotFunc(_) => ErrorKind::InvalidCallable,
            Error::UnexpectedKind { .. } => ErrorKind::UnexpectedKind,
            Error::InvalidReceiver(_) => ErrorKind::InvalidReceiver,
            Error::InvalidMethod { .. } => ErrorKind::InvalidMethod,
            Error::InvalidObject => ErrorKind::InvalidObject,
            Error::PointerLoop => ErrorKind::PointerLoop,
            Error::PointerRequired => ErrorKind::PointerRequired,
            Error::NilStructPointer => ErrorKind::NilStructPointer,
            Error::TooManyArguments => ErrorKind::TooManyArguments,
            Error::NotEnoughArguments => ErrorKind::NotEnoughArguments,
            Error::NotAssignable { .. } => ErrorKind::NotAssignable,
            Error::NotConvertible { .. } | Error::Conversion { .. } => ErrorKind::NotConvertible,
            Error::Convention(_) => ErrorKind::ConventionViolation,
            Error::Provider(_) => ErrorKind::ProviderExternalError,
            Error::FieldNotFound(_) => ErrorKind::FieldNotFound,
            Error::FieldUnsupported => ErrorKind::FieldUnsupported,
            Error::Type(_) => ErrorKind::InvalidValue,
            Error::Group(_) | Error::Context { .. } => ErrorKind::Multiple,
        }
    }

    /// The provider failure carried by this error, if the provider ran
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self.root() {
            Error::Provider(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the provider executed (and reported failure) as opposed to never running
    pub fn provider_executed(&self) -> bool {
        self.as_provider().is_some()
    }
}

/// Violations of the provider and wither conventions, detected before the call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConventionViolation {
    /// Providers return one or two values
    #[error("provider must return 1 or 2 values, given function returns {0} values")]
    ProviderArity(usize),

    /// The second value of a provider must be an error
    #[error("second value returned by provider must implement error interface, {0} given")]
    ProviderSecondResult(String),

    /// Withers return exactly one value
    #[error("wither must return 1 value, given function returns {0} values")]
    WitherArity(usize),
}

/// Failure reported by a provider that executed.
///
/// Keeps both the provider's first result and the original error value it returned.
#[derive(Clone)]
pub struct ProviderError {
    value: Value,
    error: Value,
    message: String,
}

impl ProviderError {
    pub(crate) fn new(value: Value, error: Value) -> Self {
        let message = error_message(&error).unwrap_or_else(|| error.to_string());
        ProviderError {
            value,
            error,
            message,
        }
    }

    /// First value the provider returned alongside the error
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The original error value, unchanged
    pub fn error(&self) -> &Value {
        &self.error
    }

    /// Text of the original error
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderError")
            .field("message", &self.message)
            .field("error_type", &self.error.ty().to_string())
            .finish()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

fn join_lines(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Double-quoted, ASCII-only rendering of a name, as used in error messages
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(c),
            c if c.is_ascii() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("Name"), "\"Name\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("é"), "\"\\u00e9\"");
    }

    #[test]
    fn test_prefix_distributes_over_groups() {
        let err = Error::group(vec![
            Error::TooManyArguments.prefixed("arg0"),
            Error::NotEnoughArguments.prefixed("arg1"),
        ])
        .prefixed("cannot call func()");
        assert_eq!(
            err.to_string(),
            "cannot call func(): arg0: too many input arguments\ncannot call func(): arg1: not enough input arguments"
        );
        assert_eq!(err.collection().len(), 2);
        assert_eq!(err.kind(), ErrorKind::Multiple);
    }

    #[test]
    fn test_group_of_one_is_unwrapped() {
        let err = Error::group(vec![Error::PointerLoop]);
        assert!(matches!(err, Error::PointerLoop));
    }

    #[test]
    fn test_kind_looks_through_context() {
        let err = Error::FieldNotFound("age".into()).prefixed("get (pkg.T).\"age\"");
        assert_eq!(err.kind(), ErrorKind::FieldNotFound);
        assert_eq!(err.to_string(), "get (pkg.T).\"age\": field \"age\" does not exist");
    }

    #[test]
    fn test_invalid_method_text() {
        let err = Error::InvalidMethod {
            receiver: "*struct {}".into(),
            method: "Do".into(),
        };
        assert_eq!(err.to_string(), "(*struct {}).\"Do\": invalid method");
    }
}
