//! Calling methods by name

use reflex_types::{Kind, Value};

use super::func::call_func;
use super::validate::{FuncValidator, DONT_VALIDATE};
use crate::error::{quote, Error, Result};
use crate::indirect::{kind_chain, reduce, with_owned_copy};

/// Call the method `name` of `object` with `args`.
///
/// The method is looked up on the object and then through every pointer and interface
/// layer in front of it. When that fails and `object` is a pointer, the call is forced:
/// a value boxed in an interface behind the pointer is copied, the method runs against
/// a pointer to the copy, and the copy is written back only if the call succeeds.
///
/// Errors are prefixed with `cannot call method (<type>)."<name>"`.
///
/// # Example
///
/// ```ignore
/// let book = Value::new(&book_type);
/// call_method(&book, "SetTitle", &[Value::from("Dune")], false)?;
/// ```
pub fn call_method(object: &Value, name: &str, args: &[Value], convert: bool) -> Result<Vec<Value>> {
    call_method_with(object, name, args, convert, &DONT_VALIDATE)
}

/// [`call_method`] with a signature check run before the method executes
pub fn call_method_with(
    object: &Value,
    name: &str,
    args: &[Value],
    convert: bool,
    validator: &dyn FuncValidator,
) -> Result<Vec<Value>> {
    let object = object.dynamic();
    call_method_inner(&object, name, args, convert, validator)
        .map_err(|e| e.prefixed(format!("cannot call method ({}).{}", object.ty(), quote(name))))
}

fn call_method_inner(
    object: &Value,
    name: &str,
    args: &[Value],
    convert: bool,
    validator: &dyn FuncValidator,
) -> Result<Vec<Value>> {
    match resolve_method(object, name) {
        Ok(func) => validate_and_call(&func, args, convert, validator),
        Err(Error::InvalidMethod { .. }) if is_ptr(object) => {
            tracing::debug!(object = %object.ty(), method = name, "forcing method call");
            force_call_method(object, name, args, convert, validator)
        }
        Err(e) => Err(e),
    }
}

fn validate_and_call(func: &Value, args: &[Value], convert: bool, validator: &dyn FuncValidator) -> Result<Vec<Value>> {
    validator.validate(func)?;
    call_func(func, args, convert)
}

/// Find `name` on `object` or on anything its pointers and interfaces lead to
fn resolve_method(object: &Value, name: &str) -> Result<Value> {
    if !object.is_valid() {
        return Err(Error::InvalidReceiver(object.ty().to_string()));
    }

    let mut func = object.method(name);
    kind_chain(object)?;

    let mut current = object.clone();
    while func.is_none() && matches!(current.kind(), Kind::Pointer | Kind::Interface) {
        current = current.elem();
        func = current.method(name);
    }

    func.ok_or_else(|| Error::InvalidMethod {
        receiver: object.ty().to_string(),
        method: name.to_string(),
    })
}

/// Method `name` of exactly `value`
fn method_of(value: &Value, name: &str) -> Result<Value> {
    value.method(name).ok_or_else(|| Error::InvalidMethod {
        receiver: value.ty().to_string(),
        method: name.to_string(),
    })
}

fn is_ptr(object: &Value) -> bool {
    kind_chain(object).is_ok_and(|chain| chain.prefixed(&[Kind::Pointer]))
}

fn force_call_method(
    object: &Value,
    name: &str,
    args: &[Value],
    convert: bool,
    validator: &dyn FuncValidator,
) -> Result<Vec<Value>> {
    if object.kind() != Kind::Pointer {
        return Err(Error::UnexpectedKind {
            expected: Kind::Pointer.name().to_string(),
            given: object.ty().to_string(),
        });
    }

    let reduced = reduce(object)?;
    let (value, chain) = (reduced.value, reduced.chain);

    if chain.len() == 2 && chain.prefixed(&[Kind::Pointer]) {
        let func = method_of(&value, name)?;
        return validate_and_call(&func, args, convert, validator);
    }

    if chain.len() == 3 && chain.prefixed(&[Kind::Pointer, Kind::Interface]) {
        if chain.last() == Kind::Invalid {
            return Err(Error::InvalidObject);
        }
        return with_owned_copy(&value, |copy| {
            let func = method_of(copy, name)?;
            validate_and_call(&func, args, convert, validator)
        });
    }

    method_of(&value, name).and_then(|func| validate_and_call(&func, args, convert, validator))
}
