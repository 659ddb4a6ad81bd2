//! Reading and writing struct fields by name
//!
//! Both operations see unexported fields and fields promoted from embedded structs.

use reflex_types::{Kind, Type, TypeError, Value};
use rustc_hash::FxHashSet;

use crate::coerce::coerce;
use crate::error::{quote, Error, Result};
use crate::indirect::{kind_chain, reduce, with_owned_copy};

/// Read the field `field` of a struct, through any number of pointers and interfaces.
///
/// Errors are prefixed with `get (<type>)."<field>"`.
pub fn get(strct: &Value, field: &str) -> Result<Value> {
    let strct = strct.dynamic();
    get_inner(&strct, field).map_err(|e| e.prefixed(format!("get ({}).{}", strct.ty(), quote(field))))
}

fn get_inner(strct: &Value, field: &str) -> Result<Value> {
    check_field_name(field)?;

    let chain = kind_chain(strct)?;
    let mut value = strct.clone();
    for _ in 1..chain.len() {
        value = value.elem();
    }

    if value.kind() != Kind::Struct {
        if !value.is_valid() && points_to_struct(strct.ty()) {
            return Err(Error::NilStructPointer);
        }
        return Err(unexpected("struct", strct));
    }

    let (path, _) = value
        .ty()
        .field_by_name(field)
        .ok_or_else(|| Error::FieldNotFound(field.to_string()))?;
    // a nil embedded pointer on the path
    value.field_path(&path).map(Value::into_dynamic).ok_or(Error::NilStructPointer)
}

/// Store `value` in the field `field` of the struct `strct` points at.
///
/// `strct` may reach the struct through several pointers. A struct boxed in an
/// interface behind a pointer is updated by copy and write-back. Errors are prefixed
/// with `set (<type>)."<field>"`.
pub fn set(strct: &Value, field: &str, value: &Value, convert: bool) -> Result<()> {
    let strct = strct.dynamic();
    set_inner(&strct, field, value, convert)
        .map_err(|e| e.prefixed(format!("set ({}).{}", strct.ty(), quote(field))))
}

fn set_inner(strct: &Value, field: &str, value: &Value, convert: bool) -> Result<()> {
    check_field_name(field)?;

    let reduced = reduce(strct)?;
    let chain = &reduced.chain;

    if chain.equal_to(&[Kind::Pointer, Kind::Struct]) {
        return set_on_pointer(&reduced.value, field, value, convert);
    }
    if chain.equal_to(&[Kind::Pointer, Kind::Interface, Kind::Struct]) {
        return with_owned_copy(&reduced.value, |copy| set_on_pointer(copy, field, value, convert));
    }

    if chain.last() == Kind::Invalid && points_to_struct(strct.ty()) {
        return Err(Error::NilStructPointer);
    }
    Err(unexpected("pointer to struct", strct))
}

fn set_on_pointer(ptr: &Value, field: &str, value: &Value, convert: bool) -> Result<()> {
    let strct_ty = ptr.ty().elem().unwrap_or_else(Type::invalid);
    let (path, descriptor) = strct_ty
        .field_by_name(field)
        .ok_or_else(|| Error::FieldNotFound(field.to_string()))?;

    let value = coerce(value, descriptor.ty(), convert)?;
    match ptr.update_elem(|s| s.set_field_path(&path, value)) {
        Some(Err(TypeError::NilReference(_))) | None => Err(Error::NilStructPointer),
        Some(result) => Ok(result?),
    }
}

fn check_field_name(field: &str) -> Result<()> {
    if field == "_" {
        return Err(Error::FieldUnsupported);
    }
    Ok(())
}

/// Whether `ty` is a chain of pointer types ending in a struct
pub(crate) fn points_to_struct(ty: &Type) -> bool {
    let mut seen = FxHashSet::default();
    let mut ty = ty.clone();
    while ty.kind() == Kind::Pointer {
        if !seen.insert(ty.id()) {
            return false;
        }
        match ty.elem() {
            Some(elem) => ty = elem,
            None => return false,
        }
    }
    ty.kind() == Kind::Struct
}

pub(crate) fn unexpected(expected: &str, given: &Value) -> Error {
    Error::UnexpectedKind {
        expected: expected.to_string(),
        given: given.ty().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_types::Field;

    fn person() -> Type {
        Type::named(
            "pkg.person",
            &Type::structure(vec![Field::new("name", Type::string()), Field::new("Age", Type::int())]),
        )
    }

    #[test]
    fn test_get_through_pointers() {
        let p = Value::make_struct(&person(), vec![Value::from("Mary"), Value::int(30)]).unwrap();
        assert_eq!(get(&p, "name").unwrap().as_str(), Some("Mary"));

        let ptr = Value::new_pointer(Value::new_pointer(p));
        assert_eq!(get(&ptr, "Age").unwrap().as_int(), Some(30));
    }

    #[test]
    fn test_get_errors() {
        let p = Value::zero(&person());
        let err = get(&p, "missing").unwrap_err();
        assert_eq!(err.to_string(), "get (pkg.person).\"missing\": field \"missing\" does not exist");

        let err = get(&p, "_").unwrap_err();
        assert_eq!(err.to_string(), "get (pkg.person).\"_\": \"_\" is not supported");

        let err = get(&Value::int(1), "name").unwrap_err();
        assert_eq!(err.to_string(), "get (int).\"name\": expected struct, int given");

        let nil = Value::zero(&Type::pointer(person()));
        let err = get(&nil, "name").unwrap_err();
        assert_eq!(err.to_string(), "get (*pkg.person).\"name\": pointer to nil struct given");
    }

    #[test]
    fn test_set_through_pointer() {
        let ptr = Value::new(&person());
        set(&ptr, "name", &Value::from("Jane"), false).unwrap();
        set(&ptr, "Age", &Value::uint(40), true).unwrap();
        assert_eq!(get(&ptr, "name").unwrap().as_str(), Some("Jane"));
        assert_eq!(get(&ptr, "Age").unwrap().as_int(), Some(40));
    }

    #[test]
    fn test_set_into_interface_boxed_struct() {
        let slot = Value::new_pointer(Value::any(Value::zero(&person())));
        set(&slot, "name", &Value::from("Jane"), false).unwrap();
        assert_eq!(get(&slot, "name").unwrap().as_str(), Some("Jane"));
        assert_eq!(slot.elem().kind(), Kind::Interface);
    }

    #[test]
    fn test_set_errors() {
        let err = set(&Value::zero(&person()), "name", &Value::from("x"), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "set (pkg.person).\"name\": expected pointer to struct, pkg.person given"
        );

        let ptr = Value::new(&person());
        let err = set(&ptr, "Age", &Value::from("x"), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "set (*pkg.person).\"Age\": value of type string is not assignable to type int"
        );

        let nil = Value::zero(&Type::pointer(person()));
        let err = set(&nil, "Age", &Value::int(1), false).unwrap_err();
        assert_eq!(err.to_string(), "set (*pkg.person).\"Age\": pointer to nil struct given");
    }

    #[test]
    fn test_set_promoted_field() {
        let base = Type::named("pkg.Base", &Type::structure(vec![Field::new("ID", Type::int())]));
        let outer = Type::structure(vec![Field::embedded(base)]);
        let ptr = Value::new(&outer);
        set(&ptr, "ID", &Value::int(7), false).unwrap();
        assert_eq!(get(&ptr, "ID").unwrap().as_int(), Some(7));
    }
}
