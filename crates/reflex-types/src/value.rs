//! Boxed runtime values
//!
//! A [`Value`] pairs a [`Type`] with its representation. Scalars, arrays and structs
//! are held inline and copied on clone; pointers, slices, maps, channels and functions
//! are shared references, so cloning them aliases the same storage.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::equal::{key_equal, key_hash};
use crate::error::TypeError;
use crate::kind::Kind;
use crate::ty::{PromotedMethod, Receiver, Shape, Signature, Type};

/// Body of a function value
pub type FuncFn = dyn Fn(&[Value]) -> Vec<Value> + Send + Sync;

type SharedSlice = Arc<RwLock<Vec<Value>>>;
type SharedMap = Arc<RwLock<MapEntries>>;
type SharedChan = Arc<Mutex<VecDeque<Value>>>;

// ============================================================================
// Map storage
// ============================================================================

/// Entries of a map in insertion order, indexed by key hash
#[derive(Clone, Default)]
pub(crate) struct MapEntries {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<u64, Vec<usize>>,
}

impl MapEntries {
    fn position(&self, key: &Value) -> Option<usize> {
        self.index
            .get(&key_hash(key))?
            .iter()
            .copied()
            .find(|&i| key_equal(&self.entries[i].0, key))
    }

    /// Value stored under `key`
    pub(crate) fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    fn insert(&mut self, key: Value, value: Value) {
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => {
                self.index.entry(key_hash(&key)).or_default().push(self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Entries in insertion order
    pub(crate) fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Cell
// ============================================================================

/// Addressable storage a pointer refers to
#[derive(Clone)]
pub struct Cell(Arc<RwLock<Value>>);

impl Cell {
    pub(crate) fn new(value: Value) -> Self {
        Cell(Arc::new(RwLock::new(value)))
    }

    /// Snapshot of the stored value
    pub fn load(&self) -> Value {
        self.0.read().clone()
    }

    pub(crate) fn store(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Address of the storage, stable while any pointer to it exists
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether two cells are the same storage
    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Value
// ============================================================================

/// A typed runtime value
#[derive(Clone)]
pub struct Value {
    ty: Type,
    repr: Repr,
}

#[derive(Clone)]
pub(crate) enum Repr {
    Invalid,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(f64, f64),
    String(Arc<str>),
    Array(Vec<Value>),
    Chan(Option<SharedChan>),
    Func(Option<Arc<FuncFn>>),
    Interface(Option<Box<Value>>),
    Map(Option<SharedMap>),
    Pointer(Option<Cell>),
    Slice(Option<SharedSlice>),
    Struct(Vec<Value>),
}

fn truncate_int(kind: Kind, v: i64) -> i64 {
    match kind {
        Kind::Int8 => v as i8 as i64,
        Kind::Int16 => v as i16 as i64,
        Kind::Int32 => v as i32 as i64,
        _ => v,
    }
}

fn truncate_uint(kind: Kind, v: u64) -> u64 {
    match kind {
        Kind::Uint8 => v as u8 as u64,
        Kind::Uint16 => v as u16 as u64,
        Kind::Uint32 => v as u32 as u64,
        _ => v,
    }
}

fn wrong_kind(expected: &str, ty: &Type) -> TypeError {
    TypeError::WrongKind {
        expected: expected.to_string(),
        actual: ty.to_string(),
    }
}

impl Value {
    pub(crate) fn from_parts(ty: Type, repr: Repr) -> Self {
        Value { ty, repr }
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.repr
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// The untyped nil
    pub fn nil() -> Self {
        Value {
            ty: Type::invalid(),
            repr: Repr::Invalid,
        }
    }

    /// Zero value of `ty`
    pub fn zero(ty: &Type) -> Self {
        let repr = match ty.shape() {
            Shape::Invalid => Repr::Invalid,
            Shape::Basic(kind) => match kind {
                Kind::Bool => Repr::Bool(false),
                Kind::String => Repr::String(Arc::from("")),
                k if k.is_signed() => Repr::Int(0),
                k if k.is_unsigned() => Repr::Uint(0),
                k if k.is_float() => Repr::Float(0.0),
                _ => Repr::Complex(0.0, 0.0),
            },
            Shape::Array { len, elem } => Repr::Array((0..*len).map(|_| Value::zero(elem)).collect()),
            Shape::Chan(_) => Repr::Chan(None),
            Shape::Func(_) => Repr::Func(None),
            Shape::Interface(_) => Repr::Interface(None),
            Shape::Map { .. } => Repr::Map(None),
            Shape::Pointer(_) => Repr::Pointer(None),
            Shape::Slice(_) => Repr::Slice(None),
            Shape::Struct(fields) => Repr::Struct(fields.iter().map(|f| Value::zero(f.ty())).collect()),
        };
        Value { ty: ty.clone(), repr }
    }

    /// Pointer to a fresh zero value of `ty`
    pub fn new(ty: &Type) -> Self {
        Value::new_pointer(Value::zero(ty))
    }

    /// Pointer to a fresh cell holding `value`
    pub fn new_pointer(value: Value) -> Self {
        Value {
            ty: Type::pointer(value.ty.clone()),
            repr: Repr::Pointer(Some(Cell::new(value))),
        }
    }

    /// Typed pointer to a fresh cell holding `value`
    pub fn make_pointer(ty: &Type, value: Value) -> Result<Self, TypeError> {
        let elem = ty.elem().filter(|_| ty.kind() == Kind::Pointer).ok_or_else(|| wrong_kind("pointer", ty))?;
        let value = store_as(&elem, value)?;
        Ok(Value {
            ty: ty.clone(),
            repr: Repr::Pointer(Some(Cell::new(value))),
        })
    }

    /// `value` boxed in the empty interface
    pub fn any(value: Value) -> Self {
        let inner = value.into_dynamic();
        Value {
            ty: Type::any(),
            repr: Repr::Interface(inner.is_valid().then(|| Box::new(inner))),
        }
    }

    /// `value` boxed in the interface type `iface`
    pub fn wrap(iface: &Type, value: Value) -> Result<Self, TypeError> {
        if iface.kind() != Kind::Interface {
            return Err(wrong_kind("interface", iface));
        }
        store_as(iface, value)
    }

    /// Boolean of type `ty`
    pub fn new_bool(ty: &Type, v: bool) -> Result<Self, TypeError> {
        match ty.kind() {
            Kind::Bool => Ok(Value::from_parts(ty.clone(), Repr::Bool(v))),
            _ => Err(wrong_kind("bool", ty)),
        }
    }

    /// Signed integer of type `ty`, truncated to its width
    pub fn new_int(ty: &Type, v: i64) -> Result<Self, TypeError> {
        let kind = ty.kind();
        if !kind.is_signed() {
            return Err(wrong_kind("signed integer", ty));
        }
        Ok(Value::from_parts(ty.clone(), Repr::Int(truncate_int(kind, v))))
    }

    /// Unsigned integer of type `ty`, truncated to its width
    pub fn new_uint(ty: &Type, v: u64) -> Result<Self, TypeError> {
        let kind = ty.kind();
        if !kind.is_unsigned() {
            return Err(wrong_kind("unsigned integer", ty));
        }
        Ok(Value::from_parts(ty.clone(), Repr::Uint(truncate_uint(kind, v))))
    }

    /// Floating-point number of type `ty`, rounded to its precision
    pub fn new_float(ty: &Type, v: f64) -> Result<Self, TypeError> {
        match ty.kind() {
            Kind::Float32 => Ok(Value::from_parts(ty.clone(), Repr::Float(v as f32 as f64))),
            Kind::Float64 => Ok(Value::from_parts(ty.clone(), Repr::Float(v))),
            _ => Err(wrong_kind("float", ty)),
        }
    }

    /// Complex number of type `ty`
    pub fn new_complex(ty: &Type, re: f64, im: f64) -> Result<Self, TypeError> {
        match ty.kind() {
            Kind::Complex64 => Ok(Value::from_parts(
                ty.clone(),
                Repr::Complex(re as f32 as f64, im as f32 as f64),
            )),
            Kind::Complex128 => Ok(Value::from_parts(ty.clone(), Repr::Complex(re, im))),
            _ => Err(wrong_kind("complex", ty)),
        }
    }

    /// String of type `ty`
    pub fn new_string(ty: &Type, v: impl AsRef<str>) -> Result<Self, TypeError> {
        match ty.kind() {
            Kind::String => Ok(Value::from_parts(ty.clone(), Repr::String(Arc::from(v.as_ref())))),
            _ => Err(wrong_kind("string", ty)),
        }
    }

    /// Slice of type `ty`
    pub fn make_slice(ty: &Type, items: Vec<Value>) -> Result<Self, TypeError> {
        let Shape::Slice(elem) = ty.shape() else {
            return Err(wrong_kind("slice", ty));
        };
        let items = items
            .into_iter()
            .map(|v| store_as(elem, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from_parts(ty.clone(), Repr::Slice(Some(Arc::new(RwLock::new(items))))))
    }

    /// Slice `[]elem` holding `items`
    pub fn slice_of(elem: &Type, items: Vec<Value>) -> Result<Self, TypeError> {
        Value::make_slice(&Type::slice(elem.clone()), items)
    }

    /// Array of type `ty`; `items` must match its length
    pub fn make_array(ty: &Type, items: Vec<Value>) -> Result<Self, TypeError> {
        let Shape::Array { len, elem } = ty.shape() else {
            return Err(wrong_kind("array", ty));
        };
        if items.len() != *len {
            return Err(TypeError::Arity {
                ty: ty.to_string(),
                expected: *len,
                actual: items.len(),
            });
        }
        let items = items
            .into_iter()
            .map(|v| store_as(elem, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from_parts(ty.clone(), Repr::Array(items)))
    }

    /// Map of type `ty`; later duplicates of a key overwrite earlier ones
    pub fn make_map(ty: &Type, entries: Vec<(Value, Value)>) -> Result<Self, TypeError> {
        let Shape::Map { key, .. } = ty.shape() else {
            return Err(wrong_kind("map", ty));
        };
        if !key.is_comparable() {
            return Err(TypeError::UnhashableKey(key.to_string()));
        }
        let map = Value::from_parts(ty.clone(), Repr::Map(Some(Arc::default())));
        for (k, v) in entries {
            map.map_insert(k, v)?;
        }
        Ok(map)
    }

    /// Struct of type `ty`; `fields` are given in declaration order
    pub fn make_struct(ty: &Type, fields: Vec<Value>) -> Result<Self, TypeError> {
        if ty.kind() != Kind::Struct {
            return Err(wrong_kind("struct", ty));
        }
        let decl = ty.fields();
        if decl.len() != fields.len() {
            return Err(TypeError::Arity {
                ty: ty.to_string(),
                expected: decl.len(),
                actual: fields.len(),
            });
        }
        let fields = decl
            .iter()
            .zip(fields)
            .map(|(f, v)| store_as(f.ty(), v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from_parts(ty.clone(), Repr::Struct(fields)))
    }

    /// Function of type `ty`
    pub fn make_func(
        ty: &Type,
        body: impl Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    ) -> Result<Self, TypeError> {
        if ty.kind() != Kind::Func {
            return Err(wrong_kind("func", ty));
        }
        Ok(Value::from_parts(ty.clone(), Repr::Func(Some(Arc::new(body)))))
    }

    /// Function of the unnamed type `func(signature)`
    pub fn func(signature: Signature, body: impl Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static) -> Self {
        Value::from_parts(Type::func(signature), Repr::Func(Some(Arc::new(body))))
    }

    /// Open, unbuffered-capacity channel of type `ty`
    pub fn make_chan(ty: &Type) -> Result<Self, TypeError> {
        if ty.kind() != Kind::Chan {
            return Err(wrong_kind("chan", ty));
        }
        Ok(Value::from_parts(
            ty.clone(),
            Repr::Chan(Some(Arc::new(Mutex::new(VecDeque::new())))),
        ))
    }

    /// Signed integer of the `int` type
    pub fn int(v: i64) -> Self {
        Value::from_parts(Type::int(), Repr::Int(v))
    }

    /// Unsigned integer of the `uint` type
    pub fn uint(v: u64) -> Self {
        Value::from_parts(Type::uint(), Repr::Uint(v))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Type of the value
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Kind of the value's type
    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// Whether this is anything but the untyped nil
    pub fn is_valid(&self) -> bool {
        !matches!(self.repr, Repr::Invalid)
    }

    /// Whether the value is nil (the untyped nil, or a nil pointer, slice, map, ...)
    pub fn is_nil(&self) -> bool {
        match &self.repr {
            Repr::Invalid => true,
            Repr::Chan(c) => c.is_none(),
            Repr::Func(f) => f.is_none(),
            Repr::Interface(i) => i.is_none(),
            Repr::Map(m) => m.is_none(),
            Repr::Pointer(p) => p.is_none(),
            Repr::Slice(s) => s.is_none(),
            _ => false,
        }
    }

    /// Whether the value equals the zero value of its type
    pub fn is_zero(&self) -> bool {
        match &self.repr {
            Repr::Bool(b) => !b,
            Repr::Int(i) => *i == 0,
            Repr::Uint(u) => *u == 0,
            Repr::Float(f) => *f == 0.0 && f.is_sign_positive(),
            Repr::Complex(re, im) => *re == 0.0 && *im == 0.0,
            Repr::String(s) => s.is_empty(),
            Repr::Array(items) | Repr::Struct(items) => items.iter().all(Value::is_zero),
            _ => self.is_nil(),
        }
    }

    /// Strip interface boxes, yielding the concrete value (or the untyped nil)
    pub fn dynamic(&self) -> Value {
        self.clone().into_dynamic()
    }

    /// Owned form of [`Value::dynamic`]
    pub fn into_dynamic(self) -> Value {
        let mut v = self;
        loop {
            match v.repr {
                Repr::Interface(Some(inner)) => v = *inner,
                Repr::Interface(None) => return Value::nil(),
                _ => return v,
            }
        }
    }

    /// Identity of shared storage (pointer cell, slice, map, channel or function)
    pub fn identity(&self) -> Option<usize> {
        match &self.repr {
            Repr::Pointer(Some(cell)) => Some(cell.addr()),
            Repr::Slice(Some(s)) => Some(Arc::as_ptr(s) as *const () as usize),
            Repr::Map(Some(m)) => Some(Arc::as_ptr(m) as *const () as usize),
            Repr::Chan(Some(c)) => Some(Arc::as_ptr(c) as *const () as usize),
            Repr::Func(Some(f)) => Some(Arc::as_ptr(f) as *const () as usize),
            _ => None,
        }
    }

    /// Reinterpret the representation under another type with the same structure
    pub fn reinterpret(&self, ty: &Type) -> Option<Value> {
        let compatible = match (&self.repr, ty.shape()) {
            (Repr::Invalid, _) => false,
            (_, Shape::Basic(kind)) => self.kind() == *kind,
            // unnamed pointers share the cell when their bases match structurally
            (Repr::Pointer(_), Shape::Pointer(elem)) if !ty.is_named() && !self.ty.is_named() => self
                .ty
                .elem()
                .is_some_and(|own| own.identical_ignoring_tags(elem)),
            _ => self.ty.identical_ignoring_tags(ty),
        };
        compatible.then(|| Value {
            ty: ty.clone(),
            repr: self.repr.clone(),
        })
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self.repr {
            Repr::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Signed integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self.repr {
            Repr::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Unsigned integer payload
    pub fn as_uint(&self) -> Option<u64> {
        match self.repr {
            Repr::Uint(u) => Some(u),
            _ => None,
        }
    }

    /// Floating-point payload
    pub fn as_float(&self) -> Option<f64> {
        match self.repr {
            Repr::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Complex payload as `(re, im)`
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self.repr {
            Repr::Complex(re, im) => Some((re, im)),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::String(s) => Some(s),
            _ => None,
        }
    }

    // ========================================================================
    // Containers
    // ========================================================================

    /// Length of strings (bytes), arrays, slices, maps and channels
    pub fn len(&self) -> Option<usize> {
        match &self.repr {
            Repr::String(s) => Some(s.len()),
            Repr::Array(items) => Some(items.len()),
            Repr::Slice(s) => Some(s.as_ref().map_or(0, |s| s.read().len())),
            Repr::Map(m) => Some(m.as_ref().map_or(0, |m| m.read().len())),
            Repr::Chan(c) => Some(c.as_ref().map_or(0, |c| c.lock().len())),
            _ => None,
        }
    }

    /// Element `index` of an array or slice
    pub fn index(&self, index: usize) -> Option<Value> {
        match &self.repr {
            Repr::Array(items) => items.get(index).cloned(),
            Repr::Slice(Some(s)) => s.read().get(index).cloned(),
            _ => None,
        }
    }

    /// Snapshot of the elements of an array or slice
    pub fn elements(&self) -> Option<Vec<Value>> {
        match &self.repr {
            Repr::Array(items) => Some(items.clone()),
            Repr::Slice(s) => Some(s.as_ref().map_or_else(Vec::new, |s| s.read().clone())),
            _ => None,
        }
    }

    /// Replace element `index` of an array or slice
    pub fn set_index(&mut self, index: usize, value: Value) -> Result<(), TypeError> {
        let elem = self.ty.elem().ok_or_else(|| wrong_kind("slice or array", &self.ty))?;
        let value = store_as(&elem, value)?;
        match &mut self.repr {
            Repr::Array(items) => {
                let len = items.len();
                let slot = items.get_mut(index).ok_or(TypeError::OutOfRange { index, len })?;
                *slot = value;
                Ok(())
            }
            Repr::Slice(Some(s)) => {
                let mut items = s.write();
                let len = items.len();
                let slot = items.get_mut(index).ok_or(TypeError::OutOfRange { index, len })?;
                *slot = value;
                Ok(())
            }
            Repr::Slice(None) => Err(TypeError::OutOfRange { index, len: 0 }),
            _ => Err(wrong_kind("slice or array", &self.ty)),
        }
    }

    /// Snapshot of the entries of a map, in insertion order
    pub fn map_entries(&self) -> Option<Vec<(Value, Value)>> {
        match &self.repr {
            Repr::Map(m) => Some(m.as_ref().map_or_else(Vec::new, |m| m.read().entries().to_vec())),
            _ => None,
        }
    }

    /// Value stored under `key`
    pub fn map_get(&self, key: &Value) -> Option<Value> {
        let Repr::Map(Some(m)) = &self.repr else {
            return None;
        };
        m.read().get(key).cloned()
    }

    /// Insert or replace the entry for `key`
    pub fn map_insert(&self, key: Value, value: Value) -> Result<(), TypeError> {
        let Shape::Map { key: key_ty, value: value_ty } = self.ty.shape() else {
            return Err(wrong_kind("map", &self.ty));
        };
        let Repr::Map(Some(m)) = &self.repr else {
            return Err(TypeError::NilReference(self.ty.to_string()));
        };
        let key = store_as(key_ty, key)?;
        let value = store_as(value_ty, value)?;

        m.write().insert(key, value);
        Ok(())
    }

    // ========================================================================
    // Structs
    // ========================================================================

    /// Field `index` of a struct
    pub fn field(&self, index: usize) -> Option<&Value> {
        match &self.repr {
            Repr::Struct(fields) => fields.get(index),
            _ => None,
        }
    }

    /// Field by name, following promotion through embedded structs.
    ///
    /// `None` when the name is unknown or an embedded pointer on the way is nil.
    pub fn field_by_name(&self, name: &str) -> Option<Value> {
        let (path, _) = self.ty.field_by_name(name)?;
        self.field_path(&path)
    }

    /// Field addressed by an index path, dereferencing embedded pointers on the way
    pub fn field_path(&self, path: &[usize]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let field = self.field(*first)?;
        if rest.is_empty() {
            return Some(field.clone());
        }
        if field.kind() == Kind::Pointer {
            return field.with_elem(|inner| inner.field_path(rest)).flatten();
        }
        field.field_path(rest)
    }

    /// Replace field `index` of a struct
    pub fn set_field(&mut self, index: usize, value: Value) -> Result<(), TypeError> {
        let field_ty = self
            .ty
            .field(index)
            .map(|f| f.ty().clone())
            .ok_or_else(|| wrong_kind("struct", &self.ty))?;
        let value = store_as(&field_ty, value)?;
        match &mut self.repr {
            Repr::Struct(fields) => {
                let len = fields.len();
                let slot = fields.get_mut(index).ok_or(TypeError::OutOfRange { index, len })?;
                *slot = value;
                Ok(())
            }
            _ => Err(wrong_kind("struct", &self.ty)),
        }
    }

    /// Replace a (possibly promoted) field addressed by an index path.
    ///
    /// Embedded pointers on the path are written through; a nil one fails with
    /// [`TypeError::NilReference`].
    pub fn set_field_path(&mut self, path: &[usize], value: Value) -> Result<(), TypeError> {
        match path {
            [] => Err(wrong_kind("struct", &self.ty)),
            [index] => self.set_field(*index, value),
            [index, rest @ ..] => {
                let ty = self.ty.clone();
                match &mut self.repr {
                    Repr::Struct(fields) => {
                        let len = fields.len();
                        let field = fields
                            .get_mut(*index)
                            .ok_or(TypeError::OutOfRange { index: *index, len })?;
                        if field.kind() == Kind::Pointer {
                            let nil = TypeError::NilReference(field.ty.to_string());
                            return field
                                .update_elem(|inner| inner.set_field_path(rest, value))
                                .unwrap_or(Err(nil));
                        }
                        field.set_field_path(rest, value)
                    }
                    _ => Err(wrong_kind("struct", &ty)),
                }
            }
        }
    }

    // ========================================================================
    // Pointers and interfaces
    // ========================================================================

    /// Cell a non-nil pointer refers to
    pub fn cell(&self) -> Option<&Cell> {
        match &self.repr {
            Repr::Pointer(cell) => cell.as_ref(),
            _ => None,
        }
    }

    /// The value a pointer refers to or an interface holds; the untyped nil otherwise
    pub fn elem(&self) -> Value {
        match &self.repr {
            Repr::Pointer(Some(cell)) => cell.load(),
            Repr::Interface(Some(inner)) => (**inner).clone(),
            _ => Value::nil(),
        }
    }

    /// Store through a pointer
    pub fn set_elem(&self, value: Value) -> Result<(), TypeError> {
        let Shape::Pointer(elem) = self.ty.shape() else {
            return Err(wrong_kind("pointer", &self.ty));
        };
        let Repr::Pointer(Some(cell)) = &self.repr else {
            return Err(TypeError::NilReference(self.ty.to_string()));
        };
        cell.store(store_as(elem, value)?);
        Ok(())
    }

    /// Inspect the value a pointer refers to without copying it.
    ///
    /// Runs under the cell's read lock; returns `None` for nil or non-pointer values.
    pub fn with_elem<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let cell = self.cell()?;
        let guard = cell.0.read();
        Some(f(&guard))
    }

    /// Mutate the value a pointer refers to in place.
    ///
    /// The closure runs under the cell's write lock, so it must not reach the same
    /// cell again. Returns `None` for nil or non-pointer values.
    pub fn update_elem<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let cell = self.cell()?;
        let mut guard = cell.0.write();
        Some(f(&mut guard))
    }

    // ========================================================================
    // Functions and methods
    // ========================================================================

    /// Call a function value.
    ///
    /// # Panics
    ///
    /// Panics when the value is not a non-nil function, or when the body returns a
    /// number of results that disagrees with the declared signature.
    pub fn call(&self, args: &[Value]) -> Vec<Value> {
        let Repr::Func(Some(body)) = &self.repr else {
            panic!("call of nil or non-function value of type {}", self.ty);
        };
        let results = body(args);
        if let Some(sig) = self.ty.signature() {
            assert!(
                results.len() == sig.num_out(),
                "function of type {} returned {} values",
                self.ty,
                results.len()
            );
        }
        results
    }

    /// Method `name` bound to this value as a function value.
    ///
    /// Pointers reach both value- and pointer-receiver methods of their base type;
    /// interfaces dispatch to the dynamic value on each call. Structs also reach the
    /// methods promoted from their embedded fields.
    pub fn method(&self, name: &str) -> Option<Value> {
        match self.ty.shape() {
            Shape::Invalid => None,
            Shape::Interface(methods) => {
                let sig = methods.iter().find(|m| m.name() == name)?.signature().clone();
                let inner = self.dynamic();
                let name = name.to_string();
                Some(Value::func(sig, move |args| match inner.method(&name) {
                    Some(bound) => bound.call(args),
                    None => panic!("call of method {} on nil interface value", name),
                }))
            }
            Shape::Pointer(base) if !self.ty.is_named() => {
                if matches!(base.kind(), Kind::Interface | Kind::Pointer) {
                    return None;
                }
                let Some(method) = base.declared_method(name) else {
                    let promoted = base.promoted_method(name)?;
                    return Some(bind_promoted(self.clone(), name, promoted));
                };
                let sig = method.signature().clone();
                let recv = self.clone();
                let base = base.clone();
                Some(Value::func(sig, move |args| match method.receiver() {
                    Receiver::Pointer => method.invoke(&recv, args),
                    Receiver::Value => {
                        let target = recv.elem();
                        if !target.is_valid() {
                            panic!(
                                "value method {}.{} called using nil *{} pointer",
                                base,
                                method.name(),
                                base
                            );
                        }
                        method.invoke(&target, args)
                    }
                }))
            }
            _ => {
                let Some(method) = self.ty.declared_method(name) else {
                    // a copy is not addressable: pointer methods only via embedded pointers
                    let promoted = self.ty.promoted_method(name)?;
                    if promoted.receiver == Receiver::Pointer && !promoted.through_pointer {
                        return None;
                    }
                    return Some(bind_promoted(Value::new_pointer(self.clone()), name, promoted));
                };
                if method.receiver() != Receiver::Value {
                    return None;
                }
                let sig = method.signature().clone();
                let recv = self.clone();
                Some(Value::func(sig, move |args| method.invoke(&recv, args)))
            }
        }
    }
}

/// Bind a promoted method to the struct `root` points to. The embedded field that
/// carries the method is looked up again on every call.
fn bind_promoted(root: Value, name: &str, promoted: PromotedMethod) -> Value {
    let name = name.to_string();
    Value::func(promoted.signature.clone(), move |args| {
        let (owner, rest) = embedded_owner(&root, &promoted.path);
        let Some(field) = owner.with_elem(|s| s.field_path(&rest)).flatten() else {
            panic!("invalid memory address or nil pointer dereference calling {}", name);
        };

        if promoted.receiver == Receiver::Pointer && field.kind() != Kind::Pointer {
            // by-value embed: run on a temporary cell and store the result back
            let temp = Value::new_pointer(field);
            let results = call_named(&temp, &name, args);
            if let Some(Err(err)) = owner.update_elem(|s| s.set_field_path(&rest, temp.elem())) {
                panic!("{}", err);
            }
            return results;
        }
        call_named(&field, &name, args)
    })
}

/// Pointer to the struct that directly holds the field at `path`, and the
/// remaining path inside it
fn embedded_owner(root: &Value, path: &[usize]) -> (Value, Vec<usize>) {
    let mut owner = root.clone();
    let mut start = 0;
    for end in 1..path.len() {
        let hop = owner.with_elem(|s| s.field_path(&path[start..end])).flatten();
        if let Some(hop) = hop.filter(|v| v.kind() == Kind::Pointer) {
            owner = hop;
            start = end;
        }
    }
    (owner, path[start..].to_vec())
}

fn call_named(recv: &Value, name: &str, args: &[Value]) -> Vec<Value> {
    match recv.method(name) {
        Some(bound) => bound.call(args),
        None => panic!("method {} not found on {}", name, recv.ty),
    }
}

/// Prepare `value` for a slot of type `slot`, boxing it when the slot is an interface.
pub(crate) fn store_as(slot: &Type, value: Value) -> Result<Value, TypeError> {
    let mismatch = |value: &Value| TypeError::Mismatch {
        expected: slot.to_string(),
        actual: value.ty.to_string(),
    };

    if slot.kind() == Kind::Interface {
        let inner = value.into_dynamic();
        if !inner.is_valid() {
            return Ok(Value::zero(slot));
        }
        if !inner.ty.implements(slot) {
            return Err(mismatch(&inner));
        }
        return Ok(Value {
            ty: slot.clone(),
            repr: Repr::Interface(Some(Box::new(inner))),
        });
    }

    if !value.is_valid() {
        return if slot.kind().is_nilable() {
            Ok(Value::zero(slot))
        } else {
            Err(mismatch(&value))
        };
    }

    if value.ty == *slot {
        Ok(value)
    } else {
        Err(mismatch(&value))
    }
}

// ============================================================================
// Conversions from Rust primitives
// ============================================================================

macro_rules! impl_from_signed {
    ($($t:ty => $ctor:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::from_parts(Type::$ctor(), Repr::Int(v as i64))
                }
            }
        )*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty => $ctor:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::from_parts(Type::$ctor(), Repr::Uint(v as u64))
                }
            }
        )*
    };
}

impl_from_signed!(i8 => int8, i16 => int16, i32 => int32, i64 => int64, isize => int);
impl_from_unsigned!(u8 => uint8, u16 => uint16, u32 => uint32, u64 => uint64, usize => uint);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::from_parts(Type::bool(), Repr::Bool(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::from_parts(Type::float32(), Repr::Float(v as f64))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::from_parts(Type::float64(), Repr::Float(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::from_parts(Type::string(), Repr::String(Arc::from(v)))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::from_parts(Type::string(), Repr::String(Arc::from(v)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::equal::deep_equal(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("<nil>");
        }
        write!(f, "{}({})", self.ty, self)
    }
}
