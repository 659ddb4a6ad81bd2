//! Struct field walker
//!
//! [`iterate_fields`] visits the fields of one struct. [`iterate`] builds on it with
//! getter and setter hooks, prefilling of nil struct pointers, and recursive descent
//! into nested structs, tracking the [`Path`] from the root.
//!
//! # Example
//!
//! ```ignore
//! iterate(
//!     &config,
//!     Options::new()
//!         .setter(|path, _| path.equal_names(&["DB", "Host"]).then(|| Value::from("localhost")))
//!         .prefill_nil_structs(true)
//!         .recursive(true),
//! )?;
//! ```

mod path;
mod walk;

use reflex_types::{deep_equal, Field, Kind, Type, Value};

use crate::error::{Error, Result};

pub use path::Path;
pub use walk::{iterate_fields, FieldCallback};

/// Setter hook: a replacement for the field at the path, or `None` to keep it
pub type Setter<'a> = Box<dyn FnMut(&Path, &Value) -> Option<Value> + 'a>;

/// Getter hook, called for every field before the setter
pub type Getter<'a> = Box<dyn FnMut(&Path, &Value) + 'a>;

/// Behavior of [`iterate`]
#[derive(Default)]
pub struct Options<'a> {
    setter: Option<Setter<'a>>,
    getter: Option<Getter<'a>>,
    recursive: bool,
    prefill_nil_structs: bool,
    convert_types: bool,
    convert_to_pointers: bool,
}

impl<'a> Options<'a> {
    /// No hooks, no recursion, no conversions
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide replacements for fields
    pub fn setter(mut self, setter: impl FnMut(&Path, &Value) -> Option<Value> + 'a) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Observe every field
    pub fn getter(mut self, getter: impl FnMut(&Path, &Value) + 'a) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    /// Descend into struct fields and non-nil pointers to structs
    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    /// Point nil struct pointers the setter left alone at fresh zero structs
    pub fn prefill_nil_structs(mut self, yes: bool) -> Self {
        self.prefill_nil_structs = yes;
        self
    }

    /// Convert replacements to the field type instead of requiring assignability
    pub fn convert_types(mut self, yes: bool) -> Self {
        self.convert_types = yes;
        self
    }

    /// Store non-pointer replacements for pointer fields behind a new pointer
    pub fn convert_to_pointers(mut self, yes: bool) -> Self {
        self.convert_to_pointers = yes;
        self
    }
}

/// Walk the fields of `strct` as configured by `options`.
///
/// Errors from nested structs are prefixed with the name of every field on the way
/// down, and the whole error with `fields.Iterate`.
pub fn iterate(strct: &Value, mut options: Options<'_>) -> Result<()> {
    iterate_at(strct, &mut options, &Path::default()).map_err(|e| e.prefixed("fields.Iterate"))
}

fn iterate_at(strct: &Value, options: &mut Options<'_>, path: &Path) -> Result<()> {
    let (convert, convert_to_ptr) = (options.convert_types, options.convert_to_pointers);
    let mut nested_err: Option<Error> = None;

    let mut callback = |field: &Field, value: Value| -> Option<Value> {
        if nested_err.is_some() {
            return None;
        }

        let path = path.child(field);
        if let Some(getter) = options.getter.as_mut() {
            getter(&path, &value);
        }

        let (mut value, mut set) = try_set_value(options, field, value, &path);

        if options.recursive && is_struct_or_non_nil_struct_ptr(field.ty(), &value) {
            let original = value.clone();
            let slot = Value::new_pointer(Value::any(value));
            if let Err(e) = iterate_at(&slot, options, &path) {
                nested_err = Some(e.prefixed(field.name()));
                return None;
            }
            value = slot.elem().into_dynamic();
            if !deep_equal(&original, &value) {
                set = true;
            }
        }

        set.then_some(value)
    };

    iterate_fields(strct, &mut callback, convert, convert_to_ptr)?;

    match nested_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Setter first, then prefill. Reports whether the value was replaced.
fn try_set_value(options: &mut Options<'_>, field: &Field, value: Value, path: &Path) -> (Value, bool) {
    if let Some(setter) = options.setter.as_mut() {
        if let Some(replacement) = setter(path, &value) {
            return (replacement, true);
        }
    }

    if options.prefill_nil_structs && is_struct_ptr(field.ty()) && value.is_zero() {
        let elem = field.ty().elem().unwrap_or_else(Type::invalid);
        if let Ok(ptr) = Value::make_pointer(field.ty(), Value::zero(&elem)) {
            tracing::trace!(path = %path, ty = %field.ty(), "prefilling nil struct pointer");
            return (ptr, true);
        }
    }

    (value, false)
}

fn is_struct_ptr(ty: &Type) -> bool {
    ty.kind() == Kind::Pointer && ty.elem().is_some_and(|e| e.kind() == Kind::Struct)
}

fn is_struct_or_non_nil_struct_ptr(ty: &Type, value: &Value) -> bool {
    ty.kind() == Kind::Struct || (is_struct_ptr(ty) && !value.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getter_sees_every_field_with_its_path() {
        let inner = Type::named("pkg.Inner", &Type::structure(vec![Field::new("X", Type::int())]));
        let outer = Type::named(
            "pkg.Outer",
            &Type::structure(vec![Field::new("A", Type::string()), Field::new("In", inner)]),
        );
        let mut seen = Vec::new();
        iterate(
            &Value::new(&outer),
            Options::new()
                .getter(|path, _| seen.push(path.to_string()))
                .recursive(true),
        )
        .unwrap();
        assert_eq!(seen, vec!["A", "In", "In.X"]);
    }

    #[test]
    fn test_setter_without_recursion_stays_on_top_level() {
        let t = Type::named("pkg.T", &Type::structure(vec![Field::new("N", Type::int())]));
        let ptr = Value::new(&t);
        iterate(
            &ptr,
            Options::new()
                .setter(|path, _| path.equal_names(&["N"]).then(|| Value::from(2.0f64)))
                .convert_types(true),
        )
        .unwrap();
        assert_eq!(ptr.elem().field(0).and_then(Value::as_int), Some(2));
    }
}
