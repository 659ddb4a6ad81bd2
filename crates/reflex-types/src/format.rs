//! Default formatting of values, in the `%v` style

use std::fmt;

use rustc_hash::FxHashSet;

use crate::kind::Kind;
use crate::value::{Repr, Value};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = FxHashSet::default();
        write_value(f, self, &mut seen, true)
    }
}

fn write_value(
    f: &mut fmt::Formatter<'_>,
    v: &Value,
    seen: &mut FxHashSet<usize>,
    top: bool,
) -> fmt::Result {
    let tracked = match v.identity() {
        Some(id) if matches!(v.kind(), Kind::Slice | Kind::Map) => {
            if !seen.insert(id) {
                return f.write_str("[...]");
            }
            Some(id)
        }
        _ => None,
    };

    let result = write_repr(f, v, seen, top);
    if let Some(id) = tracked {
        seen.remove(&id);
    }
    result
}

fn write_repr(
    f: &mut fmt::Formatter<'_>,
    v: &Value,
    seen: &mut FxHashSet<usize>,
    top: bool,
) -> fmt::Result {
    match v.repr() {
        Repr::Invalid => f.write_str("<nil>"),
        Repr::Bool(b) => write!(f, "{}", b),
        Repr::Int(i) => write!(f, "{}", i),
        Repr::Uint(u) => write!(f, "{}", u),
        Repr::Float(x) => write!(f, "{}", x),
        Repr::Complex(re, im) => {
            if *im < 0.0 {
                write!(f, "({}{}i)", re, im)
            } else {
                write!(f, "({}+{}i)", re, im)
            }
        }
        Repr::String(s) => f.write_str(s),
        Repr::Array(items) => write_list(f, items, seen),
        Repr::Slice(s) => {
            let items = s.as_ref().map_or_else(Vec::new, |s| s.read().clone());
            write_list(f, &items, seen)
        }
        Repr::Struct(fields) => {
            f.write_str("{")?;
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, field, seen, false)?;
            }
            f.write_str("}")
        }
        Repr::Map(m) => {
            let entries = m.as_ref().map_or_else(Vec::new, |m| m.read().entries().to_vec());
            f.write_str("map[")?;
            for (i, (k, val)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, k, seen, false)?;
                f.write_str(":")?;
                write_value(f, val, seen, false)?;
            }
            f.write_str("]")
        }
        Repr::Interface(inner) => match inner {
            Some(inner) => write_value(f, inner, seen, top),
            None => f.write_str("<nil>"),
        },
        Repr::Pointer(cell) => match cell {
            None => f.write_str("<nil>"),
            Some(cell) => {
                let target = cell.load();
                // only the outermost pointer to a composite is expanded
                if top && matches!(target.kind(), Kind::Array | Kind::Slice | Kind::Struct | Kind::Map) {
                    f.write_str("&")?;
                    write_value(f, &target, seen, false)
                } else {
                    write!(f, "{:#x}", cell.addr())
                }
            }
        },
        Repr::Func(_) | Repr::Chan(_) => match v.identity() {
            Some(addr) => write!(f, "{:#x}", addr),
            None => f.write_str("<nil>"),
        },
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value], seen: &mut FxHashSet<usize>) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write_value(f, item, seen, false)?;
    }
    f.write_str("]")
}
