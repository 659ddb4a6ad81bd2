use reflex_types::{
    deep_equal, error_message, new_error, Field, Kind, Method, Signature, Type, TypeError, Value,
};

fn person_type() -> Type {
    let person = Type::named(
        "people.Person",
        &Type::structure(vec![
            Field::new("Name", Type::string()).with_tag(r#"json:"name""#),
            Field::new("age", Type::int()),
        ]),
    );
    person
        .add_method(Method::value(
            "Greeting",
            Signature::new(Vec::new(), vec![Type::string()]),
            |recv, _| {
                let name = recv.field(0).and_then(Value::as_str).unwrap_or_default();
                vec![Value::from(format!("hello, {}", name))]
            },
        ))
        .unwrap();
    person
}

#[test]
fn test_struct_construction_checks_field_types() {
    let person = person_type();
    let ok = Value::make_struct(&person, vec![Value::from("Ann"), Value::int(30)]).unwrap();
    assert_eq!(ok.field_by_name("Name").unwrap().as_str(), Some("Ann"));

    let err = Value::make_struct(&person, vec![Value::int(1), Value::int(30)]).unwrap_err();
    assert_eq!(
        err,
        TypeError::Mismatch {
            expected: "string".to_string(),
            actual: "int".to_string(),
        }
    );
    assert!(matches!(
        Value::make_struct(&person, vec![Value::from("Ann")]),
        Err(TypeError::Arity { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn test_field_metadata() {
    let person = person_type();
    let name = person.field(0).unwrap();
    assert!(name.is_exported());
    assert_eq!(name.tag().get("json"), "name");
    assert!(!person.field(1).unwrap().is_exported());
}

#[test]
fn test_method_on_value_and_pointer() {
    let person = person_type();
    let ann = Value::make_struct(&person, vec![Value::from("Ann"), Value::int(30)]).unwrap();

    let direct = ann.method("Greeting").unwrap().call(&[]);
    assert_eq!(direct[0].as_str(), Some("hello, Ann"));

    let through_pointer = Value::new_pointer(ann).method("Greeting").unwrap().call(&[]);
    assert_eq!(through_pointer[0].as_str(), Some("hello, Ann"));
}

#[test]
fn test_interface_dispatch() {
    let person = person_type();
    let greeter = Type::interface(vec![reflex_types::MethodSig::new(
        "Greeting",
        Signature::new(Vec::new(), vec![Type::string()]),
    )]);
    let ann = Value::make_struct(&person, vec![Value::from("Bob"), Value::int(3)]).unwrap();
    let boxed = Value::wrap(&greeter, ann).unwrap();
    assert_eq!(boxed.kind(), Kind::Interface);
    assert_eq!(boxed.method("Greeting").unwrap().call(&[])[0].as_str(), Some("hello, Bob"));
}

#[test]
fn test_self_referential_type() {
    let node = Type::declare("list.Node");
    node.define(&Type::structure(vec![
        Field::new("Value", Type::int()),
        Field::new("Next", Type::pointer(node.clone())),
    ]))
    .unwrap();

    let tail = Value::new(&node);
    let mut head = Value::zero(&node);
    head.set_field(0, Value::int(1)).unwrap();
    head.set_field(1, tail.clone()).unwrap();

    assert_eq!(head.field(1).unwrap().identity(), tail.identity());
    assert_eq!(node.to_string(), "list.Node");
    assert_eq!(Type::pointer(node).to_string(), "*list.Node");
}

#[test]
fn test_types_holding_themselves_inline_are_rejected() {
    let t = Type::declare("pkg.T");
    let err = t.define(&Type::structure(vec![Field::new("x", t.clone())])).unwrap_err();
    assert_eq!(err, TypeError::CircularType("pkg.T".to_string()));
    assert_eq!(err.to_string(), "invalid recursive type pkg.T");
    assert_eq!(t.kind(), Kind::Invalid);

    let a = Type::declare("pkg.A");
    assert!(matches!(a.define(&Type::array(1, a.clone())), Err(TypeError::CircularType(_))));

    // the cycle closes through another named type
    let outer = Type::declare("pkg.Outer");
    let inner = Type::named("pkg.Inner", &Type::structure(vec![Field::new("o", Type::array(2, outer.clone()))]));
    assert!(matches!(
        outer.define(&Type::structure(vec![Field::embedded(inner)])),
        Err(TypeError::CircularType(_))
    ));

    // a rejected definition can be retried
    t.define(&Type::structure(vec![Field::new("x", Type::pointer(t.clone()))])).unwrap();
    assert_eq!(t.kind(), Kind::Struct);
}

#[test]
fn test_types_referring_to_themselves_indirectly_are_accepted() {
    let node = Type::declare("pkg.Node");
    node.define(&Type::structure(vec![
        Field::new("next", Type::pointer(node.clone())),
        Field::new("children", Type::slice(node.clone())),
        Field::new("index", Type::map(Type::string(), node.clone())),
    ]))
    .unwrap();

    let zero = Value::zero(&node);
    assert!(zero.field(0).unwrap().is_nil());
    assert!(zero.field(1).unwrap().is_nil());

    let second = Value::new(&node);
    let mut first = Value::zero(&node);
    first.set_field(0, second.clone()).unwrap();
    assert_eq!(first.field_by_name("next").unwrap().identity(), second.identity());
}

#[test]
fn test_map_lookup_by_equal_keys() {
    let map = Value::make_map(&Type::map(Type::int(), Type::int()), Vec::new()).unwrap();
    for i in 0..500 {
        map.map_insert(Value::int(i), Value::int(i * 2)).unwrap();
    }
    map.map_insert(Value::int(7), Value::int(70)).unwrap();

    assert_eq!(map.len(), Some(500));
    assert_eq!(map.map_get(&Value::int(499)).and_then(|v| v.as_int()), Some(998));
    assert_eq!(map.map_get(&Value::int(7)).and_then(|v| v.as_int()), Some(70));
    assert!(map.map_get(&Value::uint(3)).is_none());
    let entries = map.map_entries().unwrap();
    assert_eq!(entries[7].1.as_int(), Some(70));
    assert_eq!(entries[499].0.as_int(), Some(499));

    let floats = Value::make_map(&Type::map(Type::float64(), Type::int()), Vec::new()).unwrap();
    floats.map_insert(Value::from(0.0f64), Value::int(1)).unwrap();
    floats.map_insert(Value::from(-0.0f64), Value::int(2)).unwrap();
    assert_eq!(floats.len(), Some(1));
    assert_eq!(floats.map_get(&Value::from(0.0f64)).and_then(|v| v.as_int()), Some(2));

    let boxed = Value::make_map(&Type::map(Type::any(), Type::int()), vec![(Value::from("k"), Value::int(1))]).unwrap();
    assert_eq!(boxed.map_get(&Value::any(Value::from("k"))).and_then(|v| v.as_int()), Some(1));

    let key = Value::new_pointer(Value::int(1));
    let by_ptr = Value::make_map(&Type::map(key.ty().clone(), Type::int()), vec![(key.clone(), Value::int(1))]).unwrap();
    assert_eq!(by_ptr.map_get(&key).and_then(|v| v.as_int()), Some(1));
    assert!(by_ptr.map_get(&Value::new_pointer(Value::int(1))).is_none());
}

#[test]
fn test_promoted_methods() {
    let base = Type::named("pkg.Base", &Type::structure(vec![Field::new("n", Type::int())]));
    base.add_method(Method::value(
        "Hello",
        Signature::new(Vec::new(), vec![Type::string()]),
        |recv, _| vec![Value::from(format!("hello {}", recv.field(0).and_then(Value::as_int).unwrap_or_default()))],
    ))
    .unwrap();
    base.add_method(Method::pointer("Bump", Signature::default(), |recv, _| {
        recv.update_elem(|b| {
            let n = b.field(0).and_then(Value::as_int).unwrap_or_default();
            b.set_field(0, Value::int(n + 1))
        });
        Vec::new()
    }))
    .unwrap();

    let outer = Type::named("pkg.Outer", &Type::structure(vec![Field::embedded(base.clone())]));
    let promoted = outer.promoted_method("Hello").unwrap();
    assert_eq!(promoted.path, vec![0]);
    assert!(!promoted.through_pointer);
    assert_eq!(outer.method_set().len(), 1);
    assert_eq!(Type::pointer(outer.clone()).method_set().len(), 2);

    let ptr = Value::new(&outer);
    ptr.method("Bump").unwrap().call(&[]);
    ptr.method("Bump").unwrap().call(&[]);
    assert_eq!(ptr.method("Hello").unwrap().call(&[])[0].as_str(), Some("hello 2"));
    assert_eq!(ptr.elem().method("Hello").unwrap().call(&[])[0].as_str(), Some("hello 2"));
    assert!(ptr.elem().method("Bump").is_none());

    // through an embedded pointer the pointer method reaches the shared base
    let by_ptr = Type::named("pkg.ByPtr", &Type::structure(vec![Field::embedded(Type::pointer(base.clone()))]));
    assert_eq!(by_ptr.method_set().len(), 2);
    let shared = Value::new(&base);
    let holder = Value::make_struct(&by_ptr, vec![shared.clone()]).unwrap();
    holder.method("Bump").unwrap().call(&[]);
    assert_eq!(shared.elem().field(0).and_then(Value::as_int), Some(1));

    // a field of the same name hides the method; two at one depth are ambiguous
    let shadow = Type::structure(vec![Field::embedded(base.clone()), Field::new("Hello", Type::int())]);
    assert!(shadow.promoted_method("Hello").is_none());
    let other = Type::named("pkg.Other", &Type::structure(Vec::new()));
    other
        .add_method(Method::value("Hello", Signature::new(Vec::new(), vec![Type::string()]), |_, _| {
            vec![Value::from("other")]
        }))
        .unwrap();
    let both = Type::structure(vec![Field::embedded(base), Field::embedded(other)]);
    assert!(both.promoted_method("Hello").is_none());
}

#[test]
fn test_fields_promoted_through_embedded_pointers() {
    let base = Type::named("pkg.Base", &Type::structure(vec![Field::new("ID", Type::int())]));
    let outer = Type::structure(vec![Field::embedded(Type::pointer(base.clone())), Field::new("Name", Type::string())]);

    let (path, field) = outer.field_by_name("ID").unwrap();
    assert_eq!(path, vec![0, 0]);
    assert_eq!(field.ty(), &Type::int());

    let mut nil_base = Value::zero(&outer);
    assert!(nil_base.field_by_name("ID").is_none());
    assert!(matches!(
        nil_base.set_field_path(&path, Value::int(1)),
        Err(TypeError::NilReference(_))
    ));

    let shared = Value::new(&base);
    let mut value = Value::make_struct(&outer, vec![shared.clone(), Value::from("x")]).unwrap();
    value.set_field_path(&path, Value::int(42)).unwrap();
    assert_eq!(value.field_by_name("ID").and_then(|v| v.as_int()), Some(42));
    assert_eq!(shared.elem().field(0).and_then(Value::as_int), Some(42));
}

#[test]
fn test_deep_equal_on_maps_ignores_order() {
    let ty = Type::map(Type::string(), Type::int());
    let a = Value::make_map(&ty, vec![(Value::from("a"), Value::int(1)), (Value::from("b"), Value::int(2))]).unwrap();
    let b = Value::make_map(&ty, vec![(Value::from("b"), Value::int(2)), (Value::from("a"), Value::int(1))]).unwrap();
    assert!(deep_equal(&a, &b));
    b.map_insert(Value::from("c"), Value::int(3)).unwrap();
    assert!(!deep_equal(&a, &b));
}

#[test]
fn test_builtin_errors() {
    let err = new_error("disk full");
    assert!(err.ty().implements(&Type::error()));
    let boxed = Value::wrap(&Type::error(), err).unwrap();
    assert_eq!(error_message(&boxed).as_deref(), Some("disk full"));
    assert_eq!(boxed.ty().to_string(), "error");
}
