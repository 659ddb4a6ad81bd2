//! Type coercion engine
//!
//! [`coerce`] produces a value of a target type from an arbitrary value, either by
//! strict assignability or, in conversion mode, by running the converter table:
//! built-in conversions first, then element-wise sequence and map conversion.

mod builtin;
mod map;
mod sequence;

use reflex_types::{Kind, Type, Value};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

pub use builtin::convertible;

/// Coerce `value` into a value of type `to`.
///
/// Interface boxes around `value` are stripped first. The result has type `to`; for
/// interface targets it is boxed in that interface.
///
/// With `convert == false` only assignable values are accepted. The untyped nil is
/// accepted by nilable targets and yields their zero value.
pub fn coerce(value: &Value, to: &Type, convert: bool) -> Result<Value> {
    if convert {
        return Session::default().convert(value, to);
    }

    let from = value.dynamic();
    if !from.is_valid() {
        return zero_for_nilable(to);
    }
    if !assignable(from.ty(), to) {
        return Err(Error::NotAssignable {
            from: from.ty().to_string(),
            to: to.to_string(),
        });
    }
    retype(from, to)
}

/// Assignability: identical types, interface satisfaction, or identical underlying
/// types when at least one side is unnamed.
pub fn assignable(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    if to.kind() == Kind::Interface {
        return from.implements(to);
    }
    from.kind() != Kind::Invalid
        && (!from.is_named() || !to.is_named())
        && from.identical_underlying(to)
}

pub(crate) fn zero_for_nilable(to: &Type) -> Result<Value> {
    if to.kind().is_nilable() {
        return Ok(Value::zero(to));
    }
    Err(Error::NotConvertible {
        from: Type::invalid().to_string(),
        to: to.to_string(),
    })
}

/// Present an assignable value under the target type
fn retype(from: Value, to: &Type) -> Result<Value> {
    if from.ty() == to {
        return Ok(from);
    }
    if to.kind() == Kind::Interface {
        return Ok(Value::wrap(to, from)?);
    }
    let from_ty = from.ty().to_string();
    from.reinterpret(to).ok_or_else(|| Error::NotAssignable {
        from: from_ty,
        to: to.to_string(),
    })
}

// ============================================================================
// Converters
// ============================================================================

/// One rule of the conversion table.
///
/// Returns `None` when the rule does not apply to the pair of types, so the next
/// rule is tried.
pub(crate) trait Converter: Sync {
    fn convert(&self, from: &Value, to: &Type, session: &mut Session) -> Option<Result<Value>>;
}

static CONVERTERS: [&dyn Converter; 3] = [
    &builtin::BuiltIn,
    &sequence::Sequence,
    &map::Mapping,
];

/// State of one top-level conversion.
///
/// Containers already being converted are remembered by (source identity, target
/// type), so self-referential inputs map onto self-referential outputs.
#[derive(Default)]
pub(crate) struct Session {
    visited: FxHashMap<(usize, usize), Value>,
}

impl Session {
    pub(crate) fn convert(&mut self, value: &Value, to: &Type) -> Result<Value> {
        let from = value.dynamic();
        if !from.is_valid() {
            return zero_for_nilable(to);
        }

        for converter in CONVERTERS {
            if let Some(result) = converter.convert(&from, to, self) {
                return result.map_err(|source| Error::Conversion {
                    from: from.ty().to_string(),
                    to: to.to_string(),
                    source: Box::new(source),
                });
            }
        }

        Err(Error::NotConvertible {
            from: from.ty().to_string(),
            to: to.to_string(),
        })
    }

    /// Output already produced for `from` as `to`, if `from` is under conversion
    fn visited(&self, from: &Value, to: &Type) -> Option<Value> {
        let id = from.identity()?;
        let hit = self.visited.get(&(id, to.id())).cloned();
        if hit.is_some() {
            tracing::trace!(from = %from.ty(), to = %to, "reusing container under conversion");
        }
        hit
    }

    fn remember(&mut self, from: &Value, to: &Type, output: &Value) {
        if let Some(id) = from.identity() {
            self.visited.insert((id, to.id()), output.clone());
        }
    }
}
