//! Built-in error values

use once_cell::sync::Lazy;

use crate::ty::{Field, Method, Signature, Type};
use crate::value::{Repr, Value};

/// `errors.errorString`: the concrete type behind [`new_error`]
static ERROR_STRING: Lazy<Type> = Lazy::new(|| {
    let ty = Type::named(
        "errors.errorString",
        &Type::structure(vec![Field::new("s", Type::string())]),
    );
    let _ = ty.add_method(Method::pointer(
        "Error",
        Signature::new(Vec::new(), vec![Type::string()]),
        |recv, _| {
            let message = recv.elem().field(0).cloned();
            vec![message.unwrap_or_else(|| Value::from(""))]
        },
    ));
    ty
});

/// A new error value (a `*errors.errorString`) carrying `message`
pub fn new_error(message: impl AsRef<str>) -> Value {
    let inner = Value::from_parts(
        ERROR_STRING.clone(),
        Repr::Struct(vec![Value::from(message.as_ref())]),
    );
    Value::new_pointer(inner)
}

/// Text of an error value, `None` when it has no `Error() string` method
pub fn error_message(err: &Value) -> Option<String> {
    let method = err.dynamic().method("Error")?;
    let results = method.call(&[]);
    results.first()?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error_implements_error() {
        let err = new_error("boom");
        assert!(err.ty().implements(&Type::error()));
        assert!(!ERROR_STRING.implements(&Type::error()));
        assert_eq!(error_message(&err).as_deref(), Some("boom"));
        assert_eq!(error_message(&Value::any(err)).as_deref(), Some("boom"));
        assert_eq!(error_message(&Value::int(1)), None);
    }
}
