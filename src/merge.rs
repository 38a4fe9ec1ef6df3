//! Extension merge engine for author-supplied override payloads.
//!
//! Overrides are partial documents, operations, schemas or parameters written in an
//! annotation value. They are merged onto generated structures with a single recursive
//! routine over the serialized form:
//!
//! - mappings merge key by key, recursively
//! - any other override value (scalar or sequence) replaces the base value
//! - `null` in the override means "not set" and keeps the base value
//!
//! Keys the override does not mention keep their generated value.

use crate::error::{Error, Result};
use crate::idl::Annotated;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// A parsed override payload targeting structures of type `T`
#[derive(Debug, Clone, PartialEq)]
pub struct Override<T> {
    payload: Value,
    target: PhantomData<fn() -> T>,
}

impl<T> Override<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Parse an override payload.
    ///
    /// The payload is YAML (so plain JSON and relaxed flow mappings such as
    /// `{summary: "Hello"}` both work) and must be a mapping.
    pub fn parse(raw: &str) -> Result<Self> {
        let payload: Value = serde_yaml::from_str(raw)
            .map_err(|e| Error::InvalidOverride(format!("{}: {}", raw.trim(), e)))?;
        Self::from_value(payload)
    }

    /// Wrap an already structured payload, which must be a mapping
    pub fn from_value(payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::InvalidOverride(format!(
                "expected a mapping, found {}",
                payload
            )));
        }
        Ok(Self {
            payload,
            target: PhantomData,
        })
    }

    /// Typed view of the payload, if it forms a complete `T` on its own
    pub fn shape(&self) -> Option<T> {
        serde_json::from_value(self.payload.clone()).ok()
    }

    /// Merge the payload onto `base`; override values win on conflict.
    ///
    /// If the merged result no longer fits `T`, `base` is left untouched.
    pub fn apply(&self, base: &mut T) -> Result<()> {
        let mut merged = serde_json::to_value(&*base)?;
        merge_values(&mut merged, &self.payload);
        *base = serde_json::from_value(merged)
            .map_err(|e| Error::InvalidOverride(format!("merged result is invalid: {}", e)))?;
        Ok(())
    }
}

/// Recursively merge `overlay` into `base`.
pub fn merge_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        if !value.is_null() {
                            base_map.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Read the override payload stored under `key` on an IDL element.
///
/// Absent annotations yield `None` silently; malformed payloads yield `None` with a
/// warning pushed to `warnings`.
pub fn parse_override<T>(
    element: &impl Annotated,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<Override<T>>
where
    T: Serialize + DeserializeOwned,
{
    let raw = element.first_annotation(key)?;
    match Override::parse(raw) {
        Ok(parsed) => {
            debug!("Parsed {} override", key);
            Some(parsed)
        }
        Err(e) => {
            let warning = format!("Ignoring {} override: {}", key, e);
            warn!("{}", warning);
            warnings.push(warning);
            None
        }
    }
}
