//! Copying a value into a destination of another type

use reflex_types::{Kind, Type, Value};

use crate::coerce::coerce;
use crate::error::{Error, Result};

/// Coerce `from` to the type `to` points at and store it there.
///
/// `to` must be a pointer. With `convert == false` only assignable values are copied.
///
/// # Example
///
/// ```ignore
/// let dest = Value::new(&Type::slice(Type::any()));
/// copy(&ints, &dest, true)?;
/// ```
pub fn copy(from: &Value, to: &Value, convert: bool) -> Result<()> {
    let to = to.dynamic();
    if to.kind() != Kind::Pointer {
        return Err(Error::UnexpectedKind {
            expected: Kind::Pointer.name().to_string(),
            given: to.ty().to_string(),
        });
    }

    let elem_ty = to.ty().elem().unwrap_or_else(Type::invalid);
    let value = coerce(from, &elem_ty, convert)?;
    to.set_elem(value)?;
    Ok(())
}
