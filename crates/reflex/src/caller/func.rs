//! Calling function values with dynamically typed arguments

use reflex_types::{Kind, Signature, Type, Value};

use crate::coerce::coerce;
use crate::error::{Error, Result};

/// Call `func` with `args`, coercing every argument to its parameter type.
///
/// Returns one value per declared result, with interface boxes stripped. Failures are
/// prefixed with `cannot call <type of func>`; when several arguments cannot be coerced
/// every one of them is reported, one per line.
///
/// Panics raised by the function body are not caught.
///
/// # Example
///
/// ```ignore
/// let add = Value::func(Signature::new(vec![Type::int(), Type::int()], vec![Type::int()]), |args| {
///     vec![Value::int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0))]
/// });
/// let out = call(&add, &[Value::uint(1), Value::uint(2)], true)?;
/// assert_eq!(out[0].as_int(), Some(3));
/// ```
pub fn call(func: &Value, args: &[Value], convert: bool) -> Result<Vec<Value>> {
    let func = func.dynamic();
    as_func(&func)
        .and_then(|f| call_func(f, args, convert))
        .map_err(|e| e.prefixed(format!("cannot call {}", func.ty())))
}

/// The value itself when it is a non-nil function
pub(crate) fn as_func(func: &Value) -> Result<&Value> {
    if !func.is_valid() || (func.kind() == Kind::Func && func.is_nil()) {
        return Err(Error::InvalidFunc(func.ty().to_string()));
    }
    if func.kind() != Kind::Func {
        return Err(Error::NotFunc(func.ty().to_string()));
    }
    Ok(func)
}

/// Check arity, coerce arguments and call. `func` must be a non-nil function.
pub(crate) fn call_func(func: &Value, args: &[Value], convert: bool) -> Result<Vec<Value>> {
    let sig = func
        .ty()
        .signature()
        .cloned()
        .unwrap_or_default();

    if args.len() > sig.num_in() && !sig.is_variadic() {
        return Err(Error::TooManyArguments);
    }
    let min_params = if sig.is_variadic() {
        sig.num_in() - 1
    } else {
        sig.num_in()
    };
    if args.len() < min_params {
        return Err(Error::NotEnoughArguments);
    }

    let mut converted = Vec::with_capacity(args.len());
    let mut errors = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        match coerce(arg, &param_type(&sig, i), convert) {
            Ok(v) => converted.push(v),
            Err(e) => errors.push(e.prefixed(format!("arg{}", i))),
        }
    }
    if !errors.is_empty() {
        return Err(Error::group(errors));
    }

    if sig.is_variadic() {
        let extra = converted.split_off(sig.num_in() - 1);
        let last = sig.params().last().cloned().unwrap_or_else(Type::invalid);
        converted.push(Value::make_slice(&last, extra)?);
    }

    tracing::trace!(func = %func.ty(), args = converted.len(), "calling function");
    Ok(func
        .call(&converted)
        .into_iter()
        .map(Value::into_dynamic)
        .collect())
}

/// Parameter type for argument `i`; extra arguments of a variadic function take the
/// element type of the last parameter.
fn param_type(sig: &Signature, i: usize) -> Type {
    let params = sig.params();
    let Some(last) = params.len().checked_sub(1) else {
        return Type::invalid();
    };
    let i = i.min(last);
    let ty = params[i].clone();
    if sig.is_variadic() && i == last {
        return ty.elem().unwrap_or_else(Type::invalid);
    }
    ty
}
