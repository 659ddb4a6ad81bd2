//! Runtime type descriptors
//!
//! A [`Type`] is a cheap, shareable handle. Named types (including the predeclared
//! basic types) are compared by identity, unnamed types structurally, which mirrors
//! the identity rules of the host language the values model.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::error::TypeError;
use crate::kind::Kind;
use crate::value::Value;

/// Body of a method: receives the receiver and the arguments, returns the results.
pub type MethodFn = dyn Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync;

// ============================================================================
// Type
// ============================================================================

/// Shared type descriptor
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

struct TypeData {
    name: Option<String>,
    shape: OnceCell<Shape>,
    methods: RwLock<Vec<Method>>,
}

/// Structure of a type, shared by a named type and its underlying type
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// No type (untyped nil, or a declared type that was never defined)
    Invalid,
    /// Predeclared boolean, numeric or string type
    Basic(Kind),
    /// `[len]elem`
    Array {
        /// Number of elements
        len: usize,
        /// Element type
        elem: Type,
    },
    /// `chan elem`
    Chan(Type),
    /// `func(params) results`
    Func(Signature),
    /// `interface { methods }`
    Interface(Vec<MethodSig>),
    /// `map[key]value`
    Map {
        /// Key type
        key: Type,
        /// Value type
        value: Type,
    },
    /// `*elem`
    Pointer(Type),
    /// `[]elem`
    Slice(Type),
    /// `struct { fields }`
    Struct(Vec<Field>),
}

static INVALID_SHAPE: Shape = Shape::Invalid;

const BASIC_KINDS: [Kind; 17] = [
    Kind::Bool,
    Kind::Int,
    Kind::Int8,
    Kind::Int16,
    Kind::Int32,
    Kind::Int64,
    Kind::Uint,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Uintptr,
    Kind::Float32,
    Kind::Float64,
    Kind::Complex64,
    Kind::Complex128,
    Kind::String,
];

static BASIC_TYPES: Lazy<Vec<Type>> = Lazy::new(|| {
    BASIC_KINDS
        .iter()
        .map(|&kind| Type::with_shape(Some(kind.name().to_string()), Shape::Basic(kind)))
        .collect()
});

static INVALID_TYPE: Lazy<Type> = Lazy::new(|| Type::with_shape(None, Shape::Invalid));

static ANY_TYPE: Lazy<Type> = Lazy::new(|| Type::with_shape(None, Shape::Interface(Vec::new())));

static ERROR_TYPE: Lazy<Type> = Lazy::new(|| {
    Type::with_shape(
        Some("error".to_string()),
        Shape::Interface(vec![MethodSig::new(
            "Error",
            Signature::new(Vec::new(), vec![Type::string()]),
        )]),
    )
});

macro_rules! predeclared {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("The predeclared `", stringify!($fn_name), "` type")]
            pub fn $fn_name() -> Type {
                Self::basic(Kind::$kind).unwrap_or_else(Type::invalid)
            }
        )*
    };
}

impl Type {
    fn with_shape(name: Option<String>, shape: Shape) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(shape);
        Type(Arc::new(TypeData {
            name,
            shape: cell,
            methods: RwLock::new(Vec::new()),
        }))
    }

    // ========================================================================
    // Predeclared types
    // ========================================================================

    /// The type of the untyped nil
    pub fn invalid() -> Type {
        INVALID_TYPE.clone()
    }

    /// Predeclared type for a basic kind, `None` for composite kinds
    pub fn basic(kind: Kind) -> Option<Type> {
        BASIC_KINDS
            .iter()
            .position(|&k| k == kind)
            .map(|i| BASIC_TYPES[i].clone())
    }

    predeclared! {
        bool => Bool,
        int => Int,
        int8 => Int8,
        int16 => Int16,
        int32 => Int32,
        int64 => Int64,
        uint => Uint,
        uint8 => Uint8,
        uint16 => Uint16,
        uint32 => Uint32,
        uint64 => Uint64,
        uintptr => Uintptr,
        float32 => Float32,
        float64 => Float64,
        complex64 => Complex64,
        complex128 => Complex128,
        string => String,
    }

    /// Alias of `uint8`
    pub fn byte() -> Type {
        Type::uint8()
    }

    /// Alias of `int32`
    pub fn rune() -> Type {
        Type::int32()
    }

    /// The empty interface `interface {}`
    pub fn any() -> Type {
        ANY_TYPE.clone()
    }

    /// The predeclared `error` interface
    pub fn error() -> Type {
        ERROR_TYPE.clone()
    }

    // ========================================================================
    // Composite constructors
    // ========================================================================

    /// `[]elem`
    pub fn slice(elem: Type) -> Type {
        Type::with_shape(None, Shape::Slice(elem))
    }

    /// `[len]elem`
    pub fn array(len: usize, elem: Type) -> Type {
        Type::with_shape(None, Shape::Array { len, elem })
    }

    /// `map[key]value`
    pub fn map(key: Type, value: Type) -> Type {
        Type::with_shape(None, Shape::Map { key, value })
    }

    /// `*elem`
    pub fn pointer(elem: Type) -> Type {
        Type::with_shape(None, Shape::Pointer(elem))
    }

    /// `chan elem`
    pub fn chan(elem: Type) -> Type {
        Type::with_shape(None, Shape::Chan(elem))
    }

    /// Function type with the given signature
    pub fn func(signature: Signature) -> Type {
        Type::with_shape(None, Shape::Func(signature))
    }

    /// Unnamed struct type
    pub fn structure(fields: Vec<Field>) -> Type {
        Type::with_shape(None, Shape::Struct(fields))
    }

    /// Unnamed interface type
    pub fn interface(methods: Vec<MethodSig>) -> Type {
        Type::with_shape(None, Shape::Interface(methods))
    }

    /// Named type with the structure of `underlying`
    pub fn named(name: impl Into<String>, underlying: &Type) -> Type {
        Type::with_shape(Some(name.into()), underlying.shape().clone())
    }

    /// Named type whose structure is supplied later with [`Type::define`].
    ///
    /// Needed for types that refer to themselves, e.g. `type Node struct { next *Node }`.
    pub fn declare(name: impl Into<String>) -> Type {
        Type(Arc::new(TypeData {
            name: Some(name.into()),
            shape: OnceCell::new(),
            methods: RwLock::new(Vec::new()),
        }))
    }

    /// Supply the structure of a declared type.
    ///
    /// The type may refer to itself through pointers, slices, maps, channels, functions
    /// and interfaces, but not inline through struct fields or array elements.
    pub fn define(&self, underlying: &Type) -> Result<(), TypeError> {
        if holds_inline(underlying.shape(), self, &mut FxHashSet::default()) {
            return Err(TypeError::CircularType(self.to_string()));
        }
        self.0
            .shape
            .set(underlying.shape().clone())
            .map_err(|_| TypeError::AlreadyDefined(self.to_string()))
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Attach a method. Replaces an existing method of the same name.
    pub fn add_method(&self, method: Method) -> Result<(), TypeError> {
        if !self.is_named() || self.kind().is_basic() && self.is_predeclared() {
            return Err(TypeError::UnnamedReceiver {
                ty: self.to_string(),
                method: method.name,
            });
        }
        if self.fields().iter().any(|f| f.name == method.name) {
            return Err(TypeError::DuplicateMember {
                ty: self.to_string(),
                name: method.name,
            });
        }

        let mut methods = self.0.methods.write();
        match methods.iter_mut().find(|m| m.name == method.name) {
            Some(existing) => *existing = method,
            None => methods.push(method),
        }
        Ok(())
    }

    /// Builder form of [`Type::add_method`]
    pub fn with_method(self, method: Method) -> Result<Type, TypeError> {
        self.add_method(method)?;
        Ok(self)
    }

    /// Method declared directly on this named type
    pub fn declared_method(&self, name: &str) -> Option<Method> {
        self.0.methods.read().iter().find(|m| m.name == name).cloned()
    }

    /// All methods declared on this named type
    pub fn declared_methods(&self) -> Vec<Method> {
        self.0.methods.read().clone()
    }

    /// Signatures callable on a value of this type.
    ///
    /// `T` has its value-receiver methods, `*T` every method of `T`, and an
    /// interface type its declared methods. Structs add the methods promoted
    /// from their embedded fields.
    pub fn method_set(&self) -> Vec<MethodSig> {
        match self.shape() {
            Shape::Interface(methods) => methods.clone(),
            Shape::Pointer(base) if !self.is_named() => {
                if matches!(base.kind(), Kind::Interface | Kind::Pointer) {
                    return Vec::new();
                }
                let mut set: Vec<MethodSig> = base.declared_methods().iter().map(Method::sig).collect();
                base.add_promoted(&mut set, true);
                set
            }
            _ => {
                let mut set: Vec<MethodSig> = self
                    .declared_methods()
                    .iter()
                    .filter(|m| m.receiver == Receiver::Value)
                    .map(Method::sig)
                    .collect();
                self.add_promoted(&mut set, false);
                set
            }
        }
    }

    fn add_promoted(&self, set: &mut Vec<MethodSig>, addressable: bool) {
        if self.kind() != Kind::Struct {
            return;
        }
        for name in self.embedded_method_names() {
            if set.iter().any(|m| m.name == name) || self.declared_method(&name).is_some() {
                continue;
            }
            if let Some(promoted) = self.promoted_method(&name) {
                if addressable || promoted.receiver == Receiver::Value || promoted.through_pointer {
                    set.push(MethodSig::new(name, promoted.signature));
                }
            }
        }
    }

    /// Find a method promoted from the embedded fields of a struct type.
    ///
    /// Follows the same depth rules as [`Type::field_by_name`]: the shallowest
    /// method wins, a field of the same name at that depth hides it, and two
    /// candidates at one depth are ambiguous (`None`). Methods declared on the
    /// struct type itself are not considered.
    pub fn promoted_method(&self, name: &str) -> Option<PromotedMethod> {
        if self.kind() != Kind::Struct || self.fields().iter().any(|f| f.name == name) {
            return None;
        }

        let mut seen = FxHashSet::default();
        seen.insert(self.id());
        let mut level = self.embedded_children(&[], false, &mut seen);

        while !level.is_empty() {
            let mut found = None;
            let mut matches = 0;
            let mut next = Vec::new();

            for (path, ty, through_pointer) in &level {
                if let Some((signature, receiver)) = method_of_embedded(ty, name) {
                    matches += 1;
                    if found.is_none() {
                        found = Some(PromotedMethod {
                            path: path.clone(),
                            signature,
                            receiver,
                            through_pointer: *through_pointer,
                        });
                    }
                }
                if let Some(inner) = embedded_struct_of(ty) {
                    matches += inner.fields().iter().filter(|f| f.name == name).count();
                    next.extend(ty.embedded_children(path, *through_pointer, &mut seen));
                }
            }

            match matches {
                0 => level = next,
                1 => return found,
                _ => return None,
            }
        }

        None
    }

    /// Embedded fields of this struct as `(path, type, through_pointer)`, skipping
    /// structs already visited
    fn embedded_children(
        &self,
        path: &[usize],
        through_pointer: bool,
        seen: &mut FxHashSet<usize>,
    ) -> Vec<(Vec<usize>, Type, bool)> {
        let Some(parent) = embedded_struct_of(self) else {
            return Vec::new();
        };
        if !path.is_empty() && !seen.insert(parent.id()) {
            return Vec::new();
        }
        parent
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.embedded)
            .map(|(i, f)| {
                let mut field_path = path.to_vec();
                field_path.push(i);
                (field_path, f.ty.clone(), through_pointer || f.ty.kind() == Kind::Pointer)
            })
            .collect()
    }

    /// Names of every method reachable through embedded fields, shallowest first
    fn embedded_method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(self.id());
        let mut level = self.embedded_children(&[], false, &mut seen);

        while !level.is_empty() {
            let mut next = Vec::new();
            for (path, ty, through_pointer) in &level {
                let base = match ty.shape() {
                    Shape::Pointer(base) if !ty.is_named() => base.clone(),
                    _ => ty.clone(),
                };
                let declared = base.declared_methods().into_iter().map(|m| m.name);
                let listed = ty.interface_methods().iter().map(|m| m.name.clone());
                for name in declared.chain(listed) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                next.extend(ty.embedded_children(path, *through_pointer, &mut seen));
            }
            level = next;
        }

        names
    }

    /// Whether values of this type satisfy the interface `iface`
    pub fn implements(&self, iface: &Type) -> bool {
        let Shape::Interface(wanted) = iface.shape() else {
            return false;
        };
        if wanted.is_empty() {
            return true;
        }
        let have = self.method_set();
        wanted.iter().all(|w| have.iter().any(|h| h == w))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Name of a named type
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Whether the type has a name (predeclared types are named)
    pub fn is_named(&self) -> bool {
        self.0.name.is_some()
    }

    fn is_predeclared(&self) -> bool {
        BASIC_TYPES.iter().any(|t| Arc::ptr_eq(&t.0, &self.0))
    }

    /// Identity of the descriptor, stable for the life of the type
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Structure of the type
    pub fn shape(&self) -> &Shape {
        self.0.shape.get().unwrap_or(&INVALID_SHAPE)
    }

    /// Kind of the type
    pub fn kind(&self) -> Kind {
        match self.shape() {
            Shape::Invalid => Kind::Invalid,
            Shape::Basic(kind) => *kind,
            Shape::Array { .. } => Kind::Array,
            Shape::Chan(_) => Kind::Chan,
            Shape::Func(_) => Kind::Func,
            Shape::Interface(_) => Kind::Interface,
            Shape::Map { .. } => Kind::Map,
            Shape::Pointer(_) => Kind::Pointer,
            Shape::Slice(_) => Kind::Slice,
            Shape::Struct(_) => Kind::Struct,
        }
    }

    /// Whether this is an interface without methods
    pub fn is_any(&self) -> bool {
        matches!(self.shape(), Shape::Interface(m) if m.is_empty())
    }

    /// Element type of arrays, slices, pointers, channels and maps (the value type)
    pub fn elem(&self) -> Option<Type> {
        match self.shape() {
            Shape::Array { elem, .. } | Shape::Slice(elem) | Shape::Pointer(elem) | Shape::Chan(elem) => {
                Some(elem.clone())
            }
            Shape::Map { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    /// Key type of a map
    pub fn key(&self) -> Option<Type> {
        match self.shape() {
            Shape::Map { key, .. } => Some(key.clone()),
            _ => None,
        }
    }

    /// Length of an array type
    pub fn len(&self) -> Option<usize> {
        match self.shape() {
            Shape::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    /// Fields of a struct type, empty for other kinds
    pub fn fields(&self) -> &[Field] {
        match self.shape() {
            Shape::Struct(fields) => fields,
            _ => &[],
        }
    }

    /// Field at position `index`
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields().get(index)
    }

    /// Find a field by name, including fields promoted from embedded structs and
    /// embedded pointers to structs.
    ///
    /// Returns the index path to the field. Like the host language, the shallowest
    /// match wins and two matches at the same depth are ambiguous (`None`).
    pub fn field_by_name(&self, name: &str) -> Option<(Vec<usize>, Field)> {
        let mut level: Vec<(Vec<usize>, Type)> = vec![(Vec::new(), self.clone())];
        let mut seen = FxHashSet::default();
        seen.insert(self.id());

        while !level.is_empty() {
            let mut found = None;
            let mut matches = 0;
            let mut next = Vec::new();

            for (path, ty) in &level {
                for (i, field) in ty.fields().iter().enumerate() {
                    let mut field_path = path.clone();
                    field_path.push(i);
                    if field.name == name {
                        matches += 1;
                        if found.is_none() {
                            found = Some((field_path, field.clone()));
                        }
                    } else if let Some(inner) = field.embedded_struct() {
                        if seen.insert(inner.id()) {
                            next.push((field_path, inner));
                        }
                    }
                }
            }

            match matches {
                0 => level = next,
                1 => return found,
                _ => return None,
            }
        }

        None
    }

    /// Signature of a function type
    pub fn signature(&self) -> Option<&Signature> {
        match self.shape() {
            Shape::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Methods declared by an interface type
    pub fn interface_methods(&self) -> &[MethodSig] {
        match self.shape() {
            Shape::Interface(methods) => methods,
            _ => &[],
        }
    }

    /// Whether values of this type can be compared with `==` (and used as map keys)
    pub fn is_comparable(&self) -> bool {
        match self.shape() {
            Shape::Slice(_) | Shape::Map { .. } | Shape::Func(_) | Shape::Invalid => false,
            Shape::Array { elem, .. } => elem.is_comparable(),
            Shape::Struct(fields) => fields.iter().all(|f| f.ty.is_comparable()),
            _ => true,
        }
    }

    /// Identity of the underlying structures, ignoring struct tags.
    pub fn identical_ignoring_tags(&self, other: &Type) -> bool {
        shapes_identical(self.shape(), other.shape(), true)
    }

    /// Identity of the underlying structures.
    pub fn identical_underlying(&self, other: &Type) -> bool {
        shapes_identical(self.shape(), other.shape(), false)
    }
}

/// Struct reached through an embedded field of type `ty`: the type itself or the
/// target of an unnamed pointer
fn embedded_struct_of(ty: &Type) -> Option<Type> {
    match ty.shape() {
        Shape::Struct(_) => Some(ty.clone()),
        Shape::Pointer(base) if !ty.is_named() && base.kind() == Kind::Struct => Some(base.clone()),
        _ => None,
    }
}

/// Method `name` carried by an embedded field of type `ty`
fn method_of_embedded(ty: &Type, name: &str) -> Option<(Signature, Receiver)> {
    match ty.shape() {
        Shape::Interface(methods) => methods
            .iter()
            .find(|m| m.name == name)
            .map(|m| (m.signature.clone(), Receiver::Value)),
        Shape::Pointer(base) if !ty.is_named() => base
            .declared_method(name)
            .map(|m| (m.signature.clone(), m.receiver)),
        _ => ty.declared_method(name).map(|m| (m.signature.clone(), m.receiver)),
    }
}

/// Whether `shape` stores a `target` inline, through struct fields and array
/// elements. Named types are followed into their own shapes.
fn holds_inline(shape: &Shape, target: &Type, seen: &mut FxHashSet<usize>) -> bool {
    let inline: Vec<&Type> = match shape {
        Shape::Struct(fields) => fields.iter().map(|f| &f.ty).collect(),
        Shape::Array { elem, .. } => vec![elem],
        _ => return false,
    };
    inline.into_iter().any(|ty| {
        Arc::ptr_eq(&ty.0, &target.0) || (seen.insert(ty.id()) && holds_inline(ty.shape(), target, seen))
    })
}

/// Structural identity of two shapes. Nested named types still compare by identity.
fn shapes_identical(a: &Shape, b: &Shape, ignore_tags: bool) -> bool {
    if !ignore_tags {
        return a == b;
    }
    match (a, b) {
        (Shape::Struct(fa), Shape::Struct(fb)) => {
            fa.len() == fb.len()
                && fa.iter().zip(fb).all(|(x, y)| {
                    x.name == y.name
                        && x.embedded == y.embedded
                        && types_identical(&x.ty, &y.ty, ignore_tags)
                })
        }
        (Shape::Pointer(x), Shape::Pointer(y)) | (Shape::Slice(x), Shape::Slice(y)) | (Shape::Chan(x), Shape::Chan(y)) => {
            types_identical(x, y, ignore_tags)
        }
        (Shape::Array { len: la, elem: ea }, Shape::Array { len: lb, elem: eb }) => {
            la == lb && types_identical(ea, eb, ignore_tags)
        }
        (Shape::Map { key: ka, value: va }, Shape::Map { key: kb, value: vb }) => {
            types_identical(ka, kb, ignore_tags) && types_identical(va, vb, ignore_tags)
        }
        _ => a == b,
    }
}

fn types_identical(a: &Type, b: &Type, ignore_tags: bool) -> bool {
    if a.is_named() || b.is_named() {
        return a == b;
    }
    shapes_identical(a.shape(), b.shape(), ignore_tags)
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.is_named() || other.is_named() {
            return false;
        }
        self.shape() == other.shape()
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.0.name {
            return f.write_str(name);
        }
        match self.shape() {
            Shape::Invalid => f.write_str("<nil>"),
            Shape::Basic(kind) => f.write_str(kind.name()),
            Shape::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            Shape::Chan(elem) => write!(f, "chan {}", elem),
            Shape::Func(sig) => write!(f, "func{}", sig),
            Shape::Interface(methods) => {
                if methods.is_empty() {
                    return f.write_str("interface {}");
                }
                f.write_str("interface { ")?;
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}{}", m.name, m.signature)?;
                }
                f.write_str(" }")
            }
            Shape::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Shape::Pointer(elem) => write!(f, "*{}", elem),
            Shape::Slice(elem) => write!(f, "[]{}", elem),
            Shape::Struct(fields) => {
                if fields.is_empty() {
                    return f.write_str("struct {}");
                }
                f.write_str("struct { ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if !field.tag.is_empty() {
                        write!(f, " {:?}", field.tag.as_str())?;
                    }
                }
                f.write_str(" }")
            }
        }
    }
}

// ============================================================================
// Signature
// ============================================================================

/// Parameter and result types of a function
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Vec<Type>,
    results: Vec<Type>,
    variadic: bool,
}

impl Signature {
    /// Non-variadic signature
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Signature {
            params,
            results,
            variadic: false,
        }
    }

    /// Variadic signature; the last parameter must be a slice (`...T` is `[]T`)
    pub fn variadic(params: Vec<Type>, results: Vec<Type>) -> Result<Self, TypeError> {
        match params.last() {
            Some(last) if last.kind() == Kind::Slice => Ok(Signature {
                params,
                results,
                variadic: true,
            }),
            _ => Err(TypeError::BadVariadic),
        }
    }

    /// Declared parameter types
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Declared result types
    pub fn results(&self) -> &[Type] {
        &self.results
    }

    /// Whether the last parameter collects remaining arguments
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Number of declared parameters
    pub fn num_in(&self) -> usize {
        self.params.len()
    }

    /// Number of declared results
    pub fn num_out(&self) -> usize {
        self.results.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && i + 1 == self.params.len() {
                match param.elem() {
                    Some(elem) => write!(f, "...{}", elem)?,
                    None => write!(f, "{}", param)?,
                }
            } else {
                write!(f, "{}", param)?;
            }
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " {}", single),
            many => {
                f.write_str(" (")?;
                for (i, result) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", result)?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

/// One struct field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    ty: Type,
    tag: StructTag,
    embedded: bool,
}

impl Field {
    /// Named field
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
            tag: StructTag::default(),
            embedded: false,
        }
    }

    /// Embedded field; its name is the unqualified type name
    pub fn embedded(ty: Type) -> Self {
        let full = ty.to_string();
        let name = full
            .trim_start_matches('*')
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Field {
            name,
            ty,
            tag: StructTag::default(),
            embedded: true,
        }
    }

    /// Attach tag metadata
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = StructTag::new(tag);
        self
    }

    /// Field name (`_` for blank fields)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Tag metadata
    pub fn tag(&self) -> &StructTag {
        &self.tag
    }

    /// Whether the field is embedded
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Exported fields start with an uppercase letter
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
    /// Struct whose fields this embedded field promotes
    fn embedded_struct(&self) -> Option<Type> {
        if self.embedded {
            embedded_struct_of(&self.ty)
        } else {
            None
        }
    }
}

/// Struct tag in the conventional `key:"value" other:"value"` form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag(String);

impl StructTag {
    /// Wrap a raw tag string
    pub fn new(tag: impl Into<String>) -> Self {
        StructTag(tag.into())
    }

    /// Raw tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for `key`, or an empty string
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// Value for `key`, `None` when the key is absent or the tag is malformed
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut rest = self.0.as_str();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                return None;
            }

            let name_len = rest
                .char_indices()
                .find(|&(_, c)| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .map_or(rest.len(), |(i, _)| i);
            if name_len == 0 || !rest[name_len..].starts_with(":\"") {
                return None;
            }
            let name = &rest[..name_len];
            rest = &rest[name_len + 1..];

            // quoted value, honouring backslash escapes
            let bytes = rest.as_bytes();
            let mut end = 1;
            while end < bytes.len() && bytes[end] != b'"' {
                if bytes[end] == b'\\' {
                    end += 1;
                }
                end += 1;
            }
            if end >= bytes.len() {
                return None;
            }
            let quoted = &rest[1..end];
            rest = &rest[end + 1..];

            if name == key {
                return Some(unquote(quoted));
            }
        }
    }
}

fn unquote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// ============================================================================
// Methods
// ============================================================================

/// How a method receives its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Receives a copy of the value
    Value,
    /// Receives a pointer to the value
    Pointer,
}

/// Name and signature of a method, as listed by interfaces and method sets
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    name: String,
    signature: Signature,
}

impl MethodSig {
    /// Create a method signature
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        MethodSig {
            name: name.into(),
            signature,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method signature (without the receiver)
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Method reached through embedded fields, see [`Type::promoted_method`]
#[derive(Debug, Clone, PartialEq)]
pub struct PromotedMethod {
    /// Index path to the embedded field that carries the method
    pub path: Vec<usize>,
    /// Signature without the receiver
    pub signature: Signature,
    /// Receiver mode; methods of embedded interfaces count as value receivers
    pub receiver: Receiver,
    /// Whether an embedded pointer lies on the path, the carrying field included
    pub through_pointer: bool,
}

/// A method implementation attached to a named type
#[derive(Clone)]
pub struct Method {
    name: String,
    receiver: Receiver,
    signature: Signature,
    body: Arc<MethodFn>,
}

impl Method {
    /// Create a method
    pub fn new(
        name: impl Into<String>,
        receiver: Receiver,
        signature: Signature,
        body: impl Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Method {
            name: name.into(),
            receiver,
            signature,
            body: Arc::new(body),
        }
    }

    /// Method with a value receiver
    pub fn value(
        name: impl Into<String>,
        signature: Signature,
        body: impl Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Method::new(name, Receiver::Value, signature, body)
    }

    /// Method with a pointer receiver
    pub fn pointer(
        name: impl Into<String>,
        signature: Signature,
        body: impl Fn(&Value, &[Value]) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Method::new(name, Receiver::Pointer, signature, body)
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receiver mode
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Signature without the receiver
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Name and signature
    pub fn sig(&self) -> MethodSig {
        MethodSig::new(self.name.clone(), self.signature.clone())
    }

    /// Run the body with an explicit receiver
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> Vec<Value> {
        (self.body)(receiver, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predeclared_identity() {
        assert_eq!(Type::int(), Type::int());
        assert_ne!(Type::int(), Type::int64());
        assert_eq!(Type::byte(), Type::uint8());
        assert_eq!(Type::basic(Kind::Struct), None);
    }

    #[test]
    fn test_unnamed_types_compare_structurally() {
        assert_eq!(Type::slice(Type::int()), Type::slice(Type::int()));
        assert_ne!(Type::slice(Type::int()), Type::slice(Type::uint()));
        assert_eq!(
            Type::map(Type::string(), Type::any()),
            Type::map(Type::string(), Type::interface(Vec::new()))
        );
    }

    #[test]
    fn test_named_types_compare_by_identity() {
        let a = Type::named("pkg.Ints", &Type::slice(Type::int()));
        let b = Type::named("pkg.Ints", &Type::slice(Type::int()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a.identical_underlying(&b));
    }

    #[test]
    fn test_type_display() {
        let sig = Signature::new(
            vec![Type::slice(Type::int()), Type::pointer(Type::int())],
            Vec::new(),
        );
        assert_eq!(Type::func(sig).to_string(), "func([]int, *int)");

        let sig = Signature::new(Vec::new(), vec![Type::any(), Type::error()]);
        assert_eq!(Type::func(sig).to_string(), "func() (interface {}, error)");

        let sig = Signature::variadic(vec![Type::slice(Type::int())], vec![Type::int()]).unwrap();
        assert_eq!(Type::func(sig).to_string(), "func(...int) int");

        assert_eq!(Type::pointer(Type::structure(Vec::new())).to_string(), "*struct {}");
        assert_eq!(Type::map(Type::string(), Type::int()).to_string(), "map[string]int");
        assert_eq!(Type::array(3, Type::int()).to_string(), "[3]int");
        assert_eq!(Type::invalid().to_string(), "<nil>");
        assert_eq!(
            Type::structure(vec![Field::new("A", Type::int()).with_tag(r#"json:"a""#)]).to_string(),
            r#"struct { A int "json:\"a\"" }"#
        );
    }

    #[test]
    fn test_declare_and_define() {
        let node = Type::declare("pkg.Node");
        assert_eq!(node.kind(), Kind::Invalid);
        node.define(&Type::structure(vec![Field::new("next", Type::pointer(node.clone()))]))
            .unwrap();
        assert_eq!(node.kind(), Kind::Struct);
        assert_eq!(node.field(0).unwrap().ty().elem().unwrap(), node);
        assert!(node.define(&Type::structure(Vec::new())).is_err());
    }

    #[test]
    fn test_method_sets() {
        let person = Type::named("pkg.Person", &Type::structure(vec![Field::new("name", Type::string())]));
        person
            .add_method(Method::value("Name", Signature::new(Vec::new(), vec![Type::string()]), |_, _| Vec::new()))
            .unwrap();
        person
            .add_method(Method::pointer("SetName", Signature::new(vec![Type::string()], Vec::new()), |_, _| Vec::new()))
            .unwrap();

        assert_eq!(person.method_set().len(), 1);
        assert_eq!(Type::pointer(person.clone()).method_set().len(), 2);

        let namer = Type::interface(vec![MethodSig::new("Name", Signature::new(Vec::new(), vec![Type::string()]))]);
        let setter = Type::interface(vec![MethodSig::new("SetName", Signature::new(vec![Type::string()], Vec::new()))]);
        assert!(person.implements(&namer));
        assert!(!person.implements(&setter));
        assert!(Type::pointer(person).implements(&setter));
        assert!(Type::int().implements(&Type::any()));
        assert!(!Type::int().implements(&Type::error()));
    }

    #[test]
    fn test_methods_rejected_on_unnamed_types() {
        let err = Type::slice(Type::int())
            .add_method(Method::value("Len", Signature::default(), |_, _| Vec::new()))
            .unwrap_err();
        assert!(matches!(err, TypeError::UnnamedReceiver { .. }));
        assert!(Type::int()
            .add_method(Method::value("Len", Signature::default(), |_, _| Vec::new()))
            .is_err());
    }

    #[test]
    fn test_field_by_name_promotes_embedded_fields() {
        let base = Type::named("pkg.Base", &Type::structure(vec![Field::new("ID", Type::int())]));
        let outer = Type::structure(vec![Field::new("Name", Type::string()), Field::embedded(base.clone())]);

        let (path, field) = outer.field_by_name("ID").unwrap();
        assert_eq!(path, vec![1, 0]);
        assert_eq!(field.ty(), &Type::int());
        assert_eq!(outer.field(1).unwrap().name(), "Base");
        assert!(outer.field_by_name("Missing").is_none());
    }

    #[test]
    fn test_struct_tag_lookup() {
        let tag = StructTag::new(r#"json:"name,omitempty" xml:"n" esc:"a\"b""#);
        assert_eq!(tag.lookup("json").as_deref(), Some("name,omitempty"));
        assert_eq!(tag.get("xml"), "n");
        assert_eq!(tag.get("esc"), "a\"b");
        assert_eq!(tag.lookup("yaml"), None);
    }

    #[test]
    fn test_variadic_requires_slice() {
        assert_eq!(
            Signature::variadic(vec![Type::int()], Vec::new()),
            Err(TypeError::BadVariadic)
        );
    }
}
