use reflex::{get, set, ErrorKind, Field, Kind, Type, Value};

fn book() -> Type {
    Type::named(
        "pkg.Book",
        &Type::structure(vec![
            Field::new("Title", Type::string()),
            Field::new("pages", Type::int()),
            Field::new("Tags", Type::slice(Type::string())),
        ]),
    )
}

// ============================================================================
// Get
// ============================================================================

#[test]
fn test_get_through_any_number_of_indirections() {
    let b = Value::make_struct(
        &book(),
        vec![Value::from("Dune"), Value::int(412), Value::zero(&Type::slice(Type::string()))],
    )
    .unwrap();

    let layered = Value::new_pointer(Value::any(Value::new_pointer(Value::new_pointer(b.clone()))));
    assert_eq!(get(&layered, "Title").unwrap().as_str(), Some("Dune"));
    assert_eq!(get(&Value::any(b), "pages").unwrap().as_int(), Some(412));
}

#[test]
fn test_get_returns_the_dynamic_value() {
    let holder = Type::named("pkg.Holder", &Type::structure(vec![Field::new("V", Type::any())]));
    let h = Value::make_struct(&holder, vec![Value::any(Value::int(3))]).unwrap();
    let v = get(&h, "V").unwrap();
    assert_eq!(v.kind(), Kind::Int);

    let empty = get(&Value::zero(&holder), "V").unwrap();
    assert!(!empty.is_valid());
}

#[test]
fn test_get_rejects_pointer_loops() {
    let p = Type::declare("pkg.P");
    p.define(&Type::pointer(p.clone())).unwrap();
    let v = Value::make_pointer(&p, Value::nil()).unwrap();
    v.set_elem(v.clone()).unwrap();

    let err = get(&v, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PointerLoop);
    assert_eq!(err.to_string(), "get (pkg.P).\"x\": unexpected pointer loop");

    let err = set(&v, "x", &Value::int(1), false).unwrap_err();
    assert_eq!(err.to_string(), "set (pkg.P).\"x\": unexpected pointer loop");
}

#[test]
fn test_get_unsupported_and_missing_fields() {
    let b = Value::new(&book());
    assert_eq!(get(&b, "_").unwrap_err().kind(), ErrorKind::FieldUnsupported);
    assert_eq!(set(&b, "_", &Value::int(1), false).unwrap_err().kind(), ErrorKind::FieldUnsupported);

    let err = get(&b, "Author").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldNotFound);
    assert_eq!(err.to_string(), "get (*pkg.Book).\"Author\": field \"Author\" does not exist");
}

#[test]
fn test_fields_promoted_through_embedded_pointer() {
    let base = Type::named("pkg.Base", &Type::structure(vec![Field::new("ID", Type::int())]));
    let doc = Type::named(
        "pkg.Doc",
        &Type::structure(vec![Field::embedded(Type::pointer(base.clone())), Field::new("Body", Type::string())]),
    );

    let empty = Value::new(&doc);
    let err = get(&empty, "ID").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NilStructPointer);
    assert_eq!(err.to_string(), "get (*pkg.Doc).\"ID\": pointer to nil struct given");
    let err = set(&empty, "ID", &Value::int(1), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NilStructPointer);

    let shared = Value::new(&base);
    set(&empty, "Base", &shared, false).unwrap();
    set(&empty, "ID", &Value::uint(7), true).unwrap();
    assert_eq!(get(&empty, "ID").unwrap().as_int(), Some(7));
    assert_eq!(get(&shared, "ID").unwrap().as_int(), Some(7));
}

// ============================================================================
// Set
// ============================================================================

#[test]
fn test_set_through_several_pointers() {
    let ptr = Value::new(&book());
    let triple = Value::new_pointer(Value::new_pointer(ptr.clone()));
    set(&triple, "Title", &Value::from("Emma"), false).unwrap();
    assert_eq!(get(&ptr, "Title").unwrap().as_str(), Some("Emma"));
}

#[test]
fn test_set_through_interface_holding_pointer() {
    let ptr = Value::new(&book());
    let slot = Value::new_pointer(Value::any(ptr.clone()));
    set(&slot, "pages", &Value::int(99), false).unwrap();
    assert_eq!(get(&ptr, "pages").unwrap().as_int(), Some(99));
}

#[test]
fn test_set_into_interface_boxed_struct_commits_only_on_success() {
    let slot = Value::new_pointer(Value::any(Value::zero(&book())));

    let tags = Value::slice_of(&Type::any(), vec![Value::from("scifi")]).unwrap();
    set(&slot, "Tags", &tags, true).unwrap();
    let stored = get(&slot, "Tags").unwrap();
    assert_eq!(stored.ty(), &Type::slice(Type::string()));
    assert_eq!(stored.index(0).and_then(|t| t.as_str().map(str::to_string)), Some("scifi".to_string()));

    let err = set(&slot, "pages", &Value::from("many"), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConvertible);
    assert_eq!(get(&slot, "pages").unwrap().as_int(), Some(0));
}

#[test]
fn test_set_rejects_non_struct_targets() {
    let empty_slot = Value::new_pointer(Value::zero(&Type::any()));
    let err = set(&empty_slot, "Title", &Value::from("x"), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedKind);
    assert_eq!(
        err.to_string(),
        "set (*interface {}).\"Title\": expected pointer to struct, *interface {} given"
    );

    let err = set(&Value::new(&Type::int()), "Title", &Value::from("x"), false).unwrap_err();
    assert_eq!(err.to_string(), "set (*int).\"Title\": expected pointer to struct, *int given");
}
