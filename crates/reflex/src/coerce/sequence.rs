//! Element-wise conversion between slices and arrays

use reflex_types::{Kind, Type, Value};

use super::{Converter, Session};
use crate::error::Result;

pub(super) struct Sequence;

fn is_sequence(kind: Kind) -> bool {
    matches!(kind, Kind::Slice | Kind::Array)
}

impl Converter for Sequence {
    fn convert(&self, from: &Value, to: &Type, session: &mut Session) -> Option<Result<Value>> {
        if !is_sequence(from.kind()) || !is_sequence(to.kind()) {
            return None;
        }
        tracing::trace!(from = %from.ty(), to = %to, "element-wise sequence conversion");
        Some(convert_sequence(from, to, session))
    }
}

fn convert_sequence(from: &Value, to: &Type, session: &mut Session) -> Result<Value> {
    let from_elem = from.ty().elem().unwrap_or_else(Type::invalid);
    let to_elem = to.elem().unwrap_or_else(Type::invalid);
    let len = from.len().unwrap_or(0);

    // an empty input still has to have convertible element types
    if len == 0 && !from_elem.is_any() && !to_elem.is_any() {
        session.convert(&Value::zero(&from_elem), &to_elem)?;
    }

    if from.kind() == Kind::Slice && from.is_nil() {
        return Ok(Value::zero(to));
    }
    if let Some(done) = session.visited(from, to) {
        return Ok(done);
    }

    let items = from.elements().unwrap_or_default();
    let mut out = match to.kind() {
        Kind::Array => Value::zero(to),
        _ => {
            let out = Value::make_slice(to, vec![Value::zero(&to_elem); len])?;
            session.remember(from, to, &out);
            out
        }
    };

    let count = match to.len() {
        Some(n) => n.min(len),
        None => len,
    };
    for (i, item) in items.iter().take(count).enumerate() {
        let converted = session
            .convert(item, &to_elem)
            .map_err(|e| e.prefixed(format!("#{}", i)))?;
        out.set_index(i, converted)?;
    }

    Ok(out)
}
