//! Built-in conversions: the conversions the host language allows with `T(x)`

use reflex_types::{Kind, Type, Value};

use super::{assignable, retype, Converter, Session};
use crate::error::{Error, Result};

pub(super) struct BuiltIn;

impl Converter for BuiltIn {
    fn convert(&self, from: &Value, to: &Type, _session: &mut Session) -> Option<Result<Value>> {
        // a short sequence cannot fill an array; leave it to the element-wise converter
        if to.kind() == Kind::Array
            && matches!(from.kind(), Kind::Slice | Kind::Array)
            && from.len().unwrap_or(0) < to.len().unwrap_or(0)
        {
            return None;
        }
        if !convertible(from.ty(), to) {
            return None;
        }
        tracing::trace!(from = %from.ty(), to = %to, "built-in conversion");
        Some(convert_value(from, to))
    }
}

/// Whether the host language allows the conversion `to(x)` for an `x` of type `from`.
///
/// Slice-to-array conversions are allowed here regardless of length; the length is
/// checked against the actual value.
pub fn convertible(from: &Type, to: &Type) -> bool {
    if from.kind() == Kind::Invalid {
        return false;
    }
    if assignable(from, to) || from.identical_ignoring_tags(to) {
        return true;
    }

    let (fk, tk) = (from.kind(), to.kind());
    match (fk, tk) {
        (Kind::Pointer, Kind::Pointer) => {
            !from.is_named()
                && !to.is_named()
                && matches!((from.elem(), to.elem()), (Some(a), Some(b)) if a.identical_ignoring_tags(&b))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (a, b) if a.is_complex() && b.is_complex() => true,
        (a, Kind::String) if a.is_integer() => true,
        (Kind::String, Kind::Slice) => is_text_slice(to),
        (Kind::Slice, Kind::String) => is_text_slice(from),
        (Kind::Slice, Kind::Array) => from.elem() == to.elem(),
        _ => false,
    }
}

/// `[]byte` or `[]rune`; slices of named byte or rune types do not count
fn is_text_slice(ty: &Type) -> bool {
    ty.kind() == Kind::Slice && ty.elem().is_some_and(|e| e == Type::byte() || e == Type::rune())
}

fn convert_value(from: &Value, to: &Type) -> Result<Value> {
    let ft = from.ty();
    if assignable(ft, to) {
        return retype(from.clone(), to);
    }
    if let Some(v) = from.reinterpret(to) {
        return Ok(v);
    }

    let tk = to.kind();
    let converted = match (from.kind(), tk) {
        (fk, _) if fk.is_numeric() && tk.is_numeric() => numeric(from, to),
        (fk, _) if fk.is_complex() && tk.is_complex() => {
            let (re, im) = from.as_complex().unwrap_or_default();
            Value::new_complex(to, re, im)
        }
        (fk, Kind::String) if fk.is_integer() => Value::new_string(to, rune_string(from)),
        (Kind::String, Kind::Slice) => text_to_slice(from.as_str().unwrap_or_default(), to),
        (Kind::Slice, Kind::String) => Value::new_string(to, slice_to_text(from)),
        (Kind::Slice, Kind::Array) => {
            let n = to.len().unwrap_or(0);
            let mut items = from.elements().unwrap_or_default();
            items.truncate(n);
            Value::make_array(to, items)
        }
        _ => {
            return Err(Error::NotConvertible {
                from: ft.to_string(),
                to: to.to_string(),
            })
        }
    };
    Ok(converted?)
}

fn numeric(from: &Value, to: &Type) -> std::result::Result<Value, reflex_types::TypeError> {
    let kind = to.kind();
    if kind.is_signed() {
        let v = match (from.as_int(), from.as_uint(), from.as_float()) {
            (Some(i), _, _) => i,
            (_, Some(u), _) => u as i64,
            (_, _, Some(f)) => f as i64,
            _ => 0,
        };
        Value::new_int(to, v)
    } else if kind.is_unsigned() {
        let v = match (from.as_int(), from.as_uint(), from.as_float()) {
            (Some(i), _, _) => i as u64,
            (_, Some(u), _) => u,
            (_, _, Some(f)) => f as u64,
            _ => 0,
        };
        Value::new_uint(to, v)
    } else {
        let v = match (from.as_int(), from.as_uint(), from.as_float()) {
            (Some(i), _, _) => i as f64,
            (_, Some(u), _) => u as f64,
            (_, _, Some(f)) => f,
            _ => 0.0,
        };
        Value::new_float(to, v)
    }
}

/// Integer to string: the UTF-8 encoding of the code point, U+FFFD when invalid
fn rune_string(from: &Value) -> String {
    let code = match (from.as_int(), from.as_uint()) {
        (Some(i), _) => u32::try_from(i).ok(),
        (_, Some(u)) => u32::try_from(u).ok(),
        _ => None,
    };
    code.and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string()
}

fn text_to_slice(text: &str, to: &Type) -> std::result::Result<Value, reflex_types::TypeError> {
    let elem = to.elem().unwrap_or_else(Type::invalid);
    let items = if elem.kind() == Kind::Uint8 {
        text.bytes()
            .map(|b| Value::new_uint(&elem, b as u64))
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        text.chars()
            .map(|c| Value::new_int(&elem, c as i64))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    Value::make_slice(to, items)
}

/// Text of a `[]byte` or `[]rune`. Strings hold valid UTF-8, so invalid byte
/// sequences and out-of-range runes become U+FFFD.
fn slice_to_text(from: &Value) -> String {
    let items = from.elements().unwrap_or_default();
    match from.ty().elem().map(|e| e.kind()) {
        Some(Kind::Uint8) => {
            let bytes: Vec<u8> = items
                .iter()
                .filter_map(Value::as_uint)
                .map(|b| b as u8)
                .collect();
            String::from_utf8_lossy(&bytes).into_owned()
        }
        _ => items
            .iter()
            .filter_map(Value::as_int)
            .map(|r| {
                u32::try_from(r)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
    }
}
