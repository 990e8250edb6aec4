// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property access over a value's JSON object form.
//!
//! Backends that store typed values implement [`PropertyMap`](super::traits::PropertyMap)
//! on top of these helpers: read the value, transform its JSON object, write
//! the decoded result back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::traits::{StorageError, StoreResult};

/// Read one property. Values that are not JSON objects have no properties.
pub fn get_property<V: Serialize>(value: &V, name: &str) -> StoreResult<Option<Value>> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => Ok(fields.remove(name).filter(|v| !v.is_null())),
        _ => Ok(None),
    }
}

/// Return a copy of `value` with property `name` replaced.
pub fn set_property<V>(value: &V, name: &str, property: &Value) -> StoreResult<V>
where
    V: Serialize + DeserializeOwned,
{
    let mut fields = into_object(value)?;
    fields.insert(name.to_string(), property.clone());
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Overlay the non-null properties of `partial` onto `stored`.
pub fn merge<V>(stored: &V, partial: &V) -> StoreResult<V>
where
    V: Serialize + DeserializeOwned,
{
    let mut fields = into_object(stored)?;
    for (name, property) in into_object(partial)? {
        if !property.is_null() {
            fields.insert(name, property);
        }
    }
    Ok(serde_json::from_value(Value::Object(fields))?)
}

fn into_object<V: Serialize>(value: &V) -> StoreResult<serde_json::Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StorageError::Serialization(format!(
            "value has no properties (not an object): {other}"
        ))),
    }
}
