//! Reflex type model
//!
//! Runtime type descriptors and boxed values with the semantics of a statically typed
//! host: named and unnamed types, methods with value or pointer receivers, interfaces,
//! and shared-reference kinds (pointers, slices, maps, functions, channels).

#![warn(missing_docs)]

pub mod builtin;
pub mod equal;
pub mod error;
mod format;
pub mod kind;
pub mod ty;
pub mod value;

pub use builtin::{error_message, new_error};
pub use equal::{deep_equal, key_equal};
pub use error::TypeError;
pub use kind::Kind;
pub use ty::{Field, Method, MethodFn, MethodSig, PromotedMethod, Receiver, Shape, Signature, StructTag, Type};
pub use value::{Cell, FuncFn, Value};
