//! Provider and wither conventions
//!
//! A provider returns `T` or `(T, error)`; a wither returns exactly one value,
//! conventionally a modified copy of its receiver.

use reflex_types::Value;

use super::func::{as_func, call_func};
use super::method::call_method_with;
use super::validate::{FuncValidator, VALIDATE_PROVIDER, VALIDATE_WITHER};
use crate::error::{quote, Error, ProviderError, Result};

/// Call a provider function.
///
/// Failures that kept the provider from running are prefixed with
/// `cannot call provider <type>`. An error returned by the provider itself comes back
/// as [`Error::Provider`]; see [`Error::provider_executed`].
///
/// # Example
///
/// ```ignore
/// match call_provider(&open_db, &[], false) {
///     Ok(db) => use_db(db),
///     Err(e) if e.provider_executed() => eprintln!("provider failed: {}", e),
///     Err(e) => eprintln!("provider was not called: {}", e),
/// }
/// ```
pub fn call_provider(provider: &Value, args: &[Value], convert: bool) -> Result<Value> {
    let provider = provider.dynamic();
    let results = as_func(&provider)
        .and_then(|f| {
            VALIDATE_PROVIDER.validate(f)?;
            call_func(f, args, convert)
        })
        .map_err(|e| e.prefixed(format!("cannot call provider {}", provider.ty())))?;

    provider_outcome(results)
}

/// Call a provider method of `object`, resolved the same way as
/// [`call_method`](super::call_method)
pub fn call_provider_method(object: &Value, name: &str, args: &[Value], convert: bool) -> Result<Value> {
    let object = object.dynamic();
    let results = call_method_with(&object, name, args, convert, &VALIDATE_PROVIDER)
        .map_err(|e| e.prefixed(format!("cannot call provider ({}).{}", object.ty(), quote(name))))?;

    provider_outcome(results)
}

/// Call a wither method of `object` and return its single result.
///
/// On a value receiver the object is left unchanged and the modified copy is returned.
pub fn call_wither(object: &Value, name: &str, args: &[Value], convert: bool) -> Result<Value> {
    let object = object.dynamic();
    let mut results = call_method_with(&object, name, args, convert, &VALIDATE_WITHER)
        .map_err(|e| e.prefixed(format!("cannot call wither ({}).{}", object.ty(), quote(name))))?;

    Ok(results.swap_remove(0))
}

/// First result, or the provider's own error when the second result is non-nil
fn provider_outcome(mut results: Vec<Value>) -> Result<Value> {
    let error = (results.len() > 1).then(|| results.swap_remove(1));
    let value = results.into_iter().next().unwrap_or_else(Value::nil);

    match error {
        Some(error) if error.is_valid() => {
            tracing::debug!(error = %error, "provider returned error");
            Err(Error::Provider(ProviderError::new(value, error)))
        }
        _ => Ok(value),
    }
}
