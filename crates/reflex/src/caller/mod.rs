//! Function and method invoker
//!
//! Calls functions and methods whose signatures are only known at runtime. Arguments
//! are coerced to the declared parameter types, strictly or with conversions, and
//! every failing argument is reported.

mod func;
mod method;
mod provider;
mod validate;

pub use func::call;
pub use method::{call_method, call_method_with};
pub use provider::{call_provider, call_provider_method, call_wither};
pub use validate::{ChainValidator, FuncValidator, ValidateFn, DONT_VALIDATE, VALIDATE_PROVIDER, VALIDATE_WITHER};
