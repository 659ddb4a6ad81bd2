use reflex::reflex_types::deep_equal;
use reflex::{copy, ErrorKind, Field, Type, Value};

fn ints(values: &[i64]) -> Value {
    Value::slice_of(&Type::int(), values.iter().map(|v| Value::int(*v)).collect()).unwrap()
}

#[test]
fn test_copy_ints_into_any_slice() {
    let dest = Value::new(&Type::slice(Type::any()));
    copy(&ints(&[1, 2, 3]), &dest, true).unwrap();

    let expected = Value::slice_of(&Type::any(), vec![Value::int(1), Value::int(2), Value::int(3)]).unwrap();
    assert!(deep_equal(&dest.elem(), &expected));
}

#[test]
fn test_copy_strict_requires_assignability() {
    let dest = Value::new(&Type::string());
    let err = copy(&Value::int(1), &dest, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAssignable);
    assert_eq!(err.to_string(), "value of type int is not assignable to type string");
    assert_eq!(dest.elem().as_str(), Some(""));
}

#[test]
fn test_copy_destination_behind_interface() {
    let dest = Value::new(&Type::float32());
    copy(&Value::uint(7), &Value::any(dest.clone()), true).unwrap();
    assert_eq!(dest.elem().as_float(), Some(7.0));
}

#[test]
fn test_copy_struct_between_named_types() {
    let fields = vec![Field::new("X", Type::int()), Field::new("Y", Type::int())];
    let a = Type::named("pkg.A", &Type::structure(fields.clone()));
    let b = Type::named("pkg.B", &Type::structure(fields));

    let src = Value::make_struct(&a, vec![Value::int(1), Value::int(2)]).unwrap();
    let dest = Value::new(&b);
    assert_eq!(copy(&src, &dest, false).unwrap_err().kind(), ErrorKind::NotAssignable);

    copy(&src, &dest, true).unwrap();
    let out = dest.elem();
    assert_eq!(out.ty(), &b);
    assert_eq!(out.field(1).and_then(Value::as_int), Some(2));
}

#[test]
fn test_copy_into_non_pointer() {
    let err = copy(&Value::int(1), &Value::zero(&Type::slice(Type::int())), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedKind);
    assert_eq!(err.to_string(), "expected ptr, []int given");

    let err = copy(&Value::int(1), &Value::nil(), true).unwrap_err();
    assert_eq!(err.to_string(), "expected ptr, <nil> given");
}
