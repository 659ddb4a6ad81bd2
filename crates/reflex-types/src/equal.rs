//! Deep equality and `==` comparison of values

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use crate::value::{Repr, Value};

/// Recursive equality of two values, following pointers, slices and maps.
///
/// Values of different types are never equal. Pointers are equal when they share a
/// cell or their pointees are deeply equal; cycles are tolerated.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    let mut visited = FxHashSet::default();
    deep(a, b, &mut visited)
}

fn deep(a: &Value, b: &Value, visited: &mut FxHashSet<(usize, usize, usize)>) -> bool {
    if a.ty() != b.ty() {
        return false;
    }

    // An identity pair already under comparison is assumed equal; any difference
    // will be reported by the outer frame.
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y {
            return true;
        }
        if !visited.insert((x, y, a.ty().id())) {
            return true;
        }
    }

    match (a.repr(), b.repr()) {
        (Repr::Invalid, Repr::Invalid) => true,
        (Repr::Bool(x), Repr::Bool(y)) => x == y,
        (Repr::Int(x), Repr::Int(y)) => x == y,
        (Repr::Uint(x), Repr::Uint(y)) => x == y,
        (Repr::Float(x), Repr::Float(y)) => x == y,
        (Repr::Complex(xr, xi), Repr::Complex(yr, yi)) => xr == yr && xi == yi,
        (Repr::String(x), Repr::String(y)) => x == y,
        (Repr::Array(x), Repr::Array(y)) | (Repr::Struct(x), Repr::Struct(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| deep(x, y, visited))
        }
        (Repr::Interface(x), Repr::Interface(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => deep(x, y, visited),
            _ => false,
        },
        (Repr::Pointer(x), Repr::Pointer(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => deep(&x.load(), &y.load(), visited),
            _ => false,
        },
        (Repr::Slice(x), Repr::Slice(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                let x = x.read().clone();
                let y = y.read().clone();
                x.len() == y.len() && x.iter().zip(&y).all(|(x, y)| deep(x, y, visited))
            }
            _ => false,
        },
        (Repr::Map(x), Repr::Map(y)) => match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                let x = x.read().clone();
                let y = y.read().clone();
                x.entries().len() == y.entries().len()
                    && x
                        .entries()
                        .iter()
                        .all(|(k, v)| y.get(k).is_some_and(|v2| deep(v, v2, visited)))
            }
            _ => false,
        },
        // functions are only equal when both are nil
        (Repr::Func(x), Repr::Func(y)) => x.is_none() && y.is_none(),
        (Repr::Chan(x), Repr::Chan(y)) => x.is_none() && y.is_none(),
        _ => false,
    }
}

/// The `==` comparison used for map keys: pointers, channels and interfaces of
/// pointers compare by identity, everything else by content.
pub fn key_equal(a: &Value, b: &Value) -> bool {
    if a.ty() != b.ty() {
        return false;
    }
    match (a.repr(), b.repr()) {
        (Repr::Interface(Some(x)), Repr::Interface(Some(y))) => key_equal(x, y),
        (Repr::Interface(None), Repr::Interface(None)) => true,
        (Repr::Pointer(_), Repr::Pointer(_)) | (Repr::Chan(_), Repr::Chan(_)) => {
            a.identity() == b.identity()
        }
        (Repr::Array(x), Repr::Array(y)) | (Repr::Struct(x), Repr::Struct(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| key_equal(x, y))
        }
        _ => deep_equal(a, b),
    }
}

/// Hash consistent with [`key_equal`]: keys that compare equal hash alike.
pub(crate) fn key_hash(value: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    hash_key(value, &mut hasher);
    hasher.finish()
}

fn hash_key(value: &Value, state: &mut FxHasher) {
    match value.repr() {
        Repr::Interface(Some(inner)) => hash_key(inner, state),
        Repr::Pointer(_) | Repr::Chan(_) => value.identity().hash(state),
        Repr::Array(items) | Repr::Struct(items) => items.iter().for_each(|v| hash_key(v, state)),
        Repr::Bool(b) => b.hash(state),
        Repr::Int(i) => i.hash(state),
        Repr::Uint(u) => u.hash(state),
        Repr::Float(x) => float_bits(*x).hash(state),
        Repr::Complex(re, im) => {
            float_bits(*re).hash(state);
            float_bits(*im).hash(state);
        }
        Repr::String(s) => s.hash(state),
        _ => {}
    }
}

// 0.0 and -0.0 are the same key
fn float_bits(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}
