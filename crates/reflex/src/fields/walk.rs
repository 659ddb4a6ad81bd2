//! Single-level field walker

use reflex_types::{Field, Kind, Type, Value};

use crate::access::{points_to_struct, unexpected};
use crate::coerce::coerce;
use crate::error::{quote, Error, Result};
use crate::indirect::{reduce, with_owned_copy};

/// Callback of [`iterate_fields`]: receives a field and its current value, returns a
/// replacement to store or `None` to leave the field alone
pub type FieldCallback<'a> = dyn FnMut(&Field, Value) -> Option<Value> + 'a;

/// Visit every field of a struct, unexported ones included.
///
/// `strct` is a struct (read-only: any replacement fails with
/// [`Error::PointerRequired`]), a pointer to a struct, or a pointer to an interface
/// holding a struct. In the last case the struct is copied, walked, and written back
/// once every field has been handled.
///
/// Replacements are coerced to the field type. With `convert_to_ptr`, a non-pointer
/// replacement for a pointer field is coerced to the pointee type and stored behind a
/// fresh pointer.
pub fn iterate_fields(
    strct: &Value,
    callback: &mut FieldCallback<'_>,
    convert: bool,
    convert_to_ptr: bool,
) -> Result<()> {
    walk(&strct.dynamic(), callback, convert, convert_to_ptr).map_err(|e| e.prefixed("IterateFields"))
}

fn walk(strct: &Value, callback: &mut FieldCallback<'_>, convert: bool, convert_to_ptr: bool) -> Result<()> {
    if !strct.is_valid() {
        return Err(unexpected("struct", strct));
    }

    let reduced = reduce(strct)?;
    let (value, chain) = (reduced.value, reduced.chain);

    if chain.equal_to(&[Kind::Struct]) {
        return walk_value(&value, callback).map_err(|e| e.prefixed(value.ty().to_string()));
    }

    if chain.equal_to(&[Kind::Pointer, Kind::Struct]) {
        let ty = value.ty().elem().unwrap_or_else(Type::invalid);
        return walk_pointer(&value, &ty, callback, convert, convert_to_ptr).map_err(|e| e.prefixed(ty.to_string()));
    }

    if chain.equal_to(&[Kind::Pointer, Kind::Interface, Kind::Struct]) {
        return with_owned_copy(&value, |copy| iterate_fields(copy, &mut *callback, convert, convert_to_ptr))
            .map_err(|e| e.prefixed(value.ty().to_string()));
    }

    if chain.last() == Kind::Invalid && points_to_struct(strct.ty()) {
        return Err(Error::NilStructPointer);
    }
    Err(unexpected("struct or pointer to struct", strct))
}

fn walk_value(strct: &Value, callback: &mut FieldCallback<'_>) -> Result<()> {
    for (i, field) in strct.ty().fields().iter().enumerate() {
        let current = strct.field(i).cloned().unwrap_or_else(Value::nil).into_dynamic();
        if callback(field, current).is_some() {
            return Err(Error::PointerRequired);
        }
    }
    Ok(())
}

fn walk_pointer(
    ptr: &Value,
    ty: &Type,
    callback: &mut FieldCallback<'_>,
    convert: bool,
    convert_to_ptr: bool,
) -> Result<()> {
    for (i, field) in ty.fields().iter().enumerate() {
        // the lock is released before the callback runs; it may reach this struct again
        let current = ptr
            .with_elem(|s| s.field(i).cloned())
            .flatten()
            .unwrap_or_else(Value::nil)
            .into_dynamic();

        let Some(replacement) = callback(field, current) else {
            continue;
        };

        let new_value = field_value(field, &replacement, convert, convert_to_ptr)
            .map_err(|e| e.prefixed(format!("field {} {}", i, quote(field.name()))))?;

        match ptr.update_elem(|s| s.set_field(i, new_value)) {
            Some(result) => result?,
            None => return Err(Error::NilStructPointer),
        }
    }
    Ok(())
}

fn field_value(field: &Field, replacement: &Value, convert: bool, convert_to_ptr: bool) -> Result<Value> {
    let ty = field.ty();
    if convert_to_ptr && ty.kind() == Kind::Pointer {
        let dynamic = replacement.dynamic();
        if dynamic.is_valid() && dynamic.kind() != Kind::Pointer {
            let elem = ty.elem().unwrap_or_else(Type::invalid);
            let value = coerce(&dynamic, &elem, convert)?;
            tracing::trace!(field = field.name(), ty = %ty, "storing replacement behind a new pointer");
            return Ok(Value::make_pointer(ty, value)?);
        }
    }
    coerce(replacement, ty, convert)
}
