//! Key- and value-wise conversion between maps

use reflex_types::{Kind, Type, Value};

use super::{Converter, Session};
use crate::error::Result;

pub(super) struct Mapping;

impl Converter for Mapping {
    fn convert(&self, from: &Value, to: &Type, session: &mut Session) -> Option<Result<Value>> {
        if from.kind() != Kind::Map || to.kind() != Kind::Map {
            return None;
        }
        tracing::trace!(from = %from.ty(), to = %to, "element-wise map conversion");
        Some(convert_map(from, to, session))
    }
}

fn convert_map(from: &Value, to: &Type, session: &mut Session) -> Result<Value> {
    let (from_key, from_value) = key_value(from.ty());
    let (to_key, to_value) = key_value(to);

    if from.len().unwrap_or(0) == 0 {
        if !from_key.is_any() || !to_key.is_any() {
            session
                .convert(&Value::zero(&from_key), &to_key)
                .map_err(|e| e.prefixed("non convertible keys"))?;
        }
        if !from_value.is_any() || !to_value.is_any() {
            session
                .convert(&Value::zero(&from_value), &to_value)
                .map_err(|e| e.prefixed("non convertible values"))?;
        }
    }

    if from.is_nil() {
        return Ok(Value::zero(to));
    }
    if let Some(done) = session.visited(from, to) {
        return Ok(done);
    }

    let out = Value::make_map(to, Vec::new())?;
    session.remember(from, to, &out);

    for (key, value) in from.map_entries().unwrap_or_default() {
        let key = session
            .convert(&key, &to_key)
            .map_err(|e| e.prefixed("map key"))?;
        let value = session
            .convert(&value, &to_value)
            .map_err(|e| e.prefixed("map value"))?;
        out.map_insert(key, value)?;
    }

    Ok(out)
}

fn key_value(ty: &Type) -> (Type, Type) {
    (
        ty.key().unwrap_or_else(Type::invalid),
        ty.elem().unwrap_or_else(Type::invalid),
    )
}
