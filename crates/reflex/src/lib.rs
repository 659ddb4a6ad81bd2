//! Reflex - dynamic invocation and type coercion over runtime values
//!
//! This crate works on [`reflex_types::Value`]s whose types are only known at
//! runtime. It provides:
//!
//! - [`coerce`]: produce a value of a target type, strictly or with conversions
//! - [`call`], [`call_method`], [`call_provider`], [`call_provider_method`],
//!   [`call_wither`]: invoke functions and methods with coerced arguments
//! - [`copy`]: coerce a value into the storage a pointer refers to
//! - [`get`], [`set`]: read and write struct fields by name
//! - [`iterate`], [`iterate_fields`]: walk struct fields with getter and setter hooks
//!
//! # Example
//!
//! ```ignore
//! use reflex::{call, Signature, Type, Value};
//!
//! let add = Value::func(
//!     Signature::new(vec![Type::int(), Type::int()], vec![Type::int()]),
//!     |args| vec![Value::int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0))],
//! );
//! let out = call(&add, &[Value::uint(1), Value::uint(2)], true)?;
//! assert_eq!(out[0].as_int(), Some(3));
//! ```

#![warn(missing_docs)]

pub mod access;
pub mod caller;
pub mod coerce;
pub mod copier;
pub mod error;
pub mod fields;
pub mod indirect;

pub use access::{get, set};
pub use caller::{
    call, call_method, call_method_with, call_provider, call_provider_method, call_wither, ChainValidator,
    FuncValidator, DONT_VALIDATE, VALIDATE_PROVIDER, VALIDATE_WITHER,
};
pub use coerce::{assignable, coerce, convertible};
pub use copier::copy;
pub use error::{ConventionViolation, Error, ErrorKind, ProviderError, Result};
pub use fields::{iterate, iterate_fields, Options, Path};
pub use indirect::{kind_chain, reduce, KindChain, Reduced};

pub use reflex_types;
pub use reflex_types::{Field, Kind, Method, MethodSig, PromotedMethod, Receiver, Signature, StructTag, Type, Value};
