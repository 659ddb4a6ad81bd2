//! Indirection resolver
//!
//! Walks the pointer and interface layers in front of a value, recording the kind of
//! every layer, and collapses the layers that add nothing on the way to a settable
//! location.

use std::fmt;

use reflex_types::{Kind, Value};
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};

/// Kinds met while unwrapping pointers and interfaces, outermost first.
///
/// The last entry is the terminal kind, or [`Kind::Invalid`] when the chain ends in a
/// nil pointer or a nil interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindChain(Vec<Kind>);

impl KindChain {
    /// All kinds of the chain
    pub fn kinds(&self) -> &[Kind] {
        &self.0
    }

    /// Number of layers, the terminal one included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the chain starts with `kinds`
    pub fn prefixed(&self, kinds: &[Kind]) -> bool {
        self.0.starts_with(kinds)
    }

    /// Whether the chain is exactly `kinds`
    pub fn equal_to(&self, kinds: &[Kind]) -> bool {
        self.0 == kinds
    }

    /// Terminal kind
    pub fn last(&self) -> Kind {
        self.0.last().copied().unwrap_or(Kind::Invalid)
    }

    fn drop_front(&mut self, n: usize) {
        self.0.drain(..n);
    }
}

impl fmt::Display for KindChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|k| k.name()).collect();
        write!(f, "[{}]", names.join(" "))
    }
}

/// Kinds of every pointer and interface layer in front of `value`.
///
/// Fails with [`Error::PointerLoop`] when a pointer refers, directly or transitively, to
/// its own storage.
pub fn kind_chain(value: &Value) -> Result<KindChain> {
    let mut visited = FxHashSet::default();
    let mut kinds = Vec::new();
    let mut current = value.clone();

    loop {
        let kind = if current.is_valid() {
            current.kind()
        } else {
            Kind::Invalid
        };
        kinds.push(kind);

        match kind {
            Kind::Pointer => {
                if let Some(cell) = current.cell() {
                    if !visited.insert(cell.addr()) {
                        return Err(Error::PointerLoop);
                    }
                }
            }
            Kind::Interface => {}
            _ => break,
        }
        current = current.elem();
    }

    Ok(KindChain(kinds))
}

/// A value with its redundant leading indirections removed
#[derive(Debug, Clone)]
pub struct Reduced {
    /// The value after collapsing
    pub value: Value,
    /// Kind chain of [`Reduced::value`]
    pub chain: KindChain,
}

/// Collapse leading `(ptr, ptr)` layers by one and `(ptr, interface, ptr)` layers by two
/// until neither applies.
pub fn reduce(value: &Value) -> Result<Reduced> {
    let mut chain = kind_chain(value)?;
    let mut value = value.clone();

    loop {
        if chain.prefixed(&[Kind::Pointer, Kind::Pointer]) {
            value = value.elem();
            chain.drop_front(1);
        } else if chain.prefixed(&[Kind::Pointer, Kind::Interface, Kind::Pointer]) {
            value = value.elem().elem();
            chain.drop_front(2);
        } else {
            break;
        }
    }

    Ok(Reduced { value, chain })
}

/// Borrow, mutate, commit.
///
/// `slot` points at an interface. Its dynamic value is copied into fresh storage, `f`
/// runs against a pointer to that copy, and the copy is written back into the slot only
/// when `f` succeeds. On failure the slot is left untouched.
pub(crate) fn with_owned_copy<R>(slot: &Value, f: impl FnOnce(&Value) -> Result<R>) -> Result<R> {
    let held = slot.elem().dynamic();
    let copy = Value::new_pointer(held);

    let out = f(&copy)?;

    tracing::trace!(slot = %slot.ty(), held = %copy.elem().ty(), "committing owned copy");
    slot.set_elem(copy.elem())?;
    Ok(out)
}
