//! The attribute bag persisted alongside a volume, and the process-wide
//! registry that tells a reader how to decode each attribute's opaque
//! payload.
//!
//! Comparison of "same type" is by the type-name string, not by
//! language-level `TypeId`, so a reader built as a separate dynamic
//! library still recognises attributes written by another build.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::error::VoxError;

/// A typed attribute value. Primitive scalars round-trip through a
/// fixed-size opaque blob tagged with their type name; strings through
/// their raw bytes (or a single NUL byte when empty).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl AttributeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::I32(_) => "i32",
            AttributeValue::I64(_) => "i64",
            AttributeValue::U32(_) => "u32",
            AttributeValue::U64(_) => "u64",
            AttributeValue::F32(_) => "f32",
            AttributeValue::F64(_) => "f64",
            AttributeValue::Str(_) => "str",
        }
    }

    /// The opaque payload persisted alongside the type-name tag.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AttributeValue::Bool(v) => vec![*v as u8],
            AttributeValue::I32(v) => v.to_le_bytes().to_vec(),
            AttributeValue::I64(v) => v.to_le_bytes().to_vec(),
            AttributeValue::U32(v) => v.to_le_bytes().to_vec(),
            AttributeValue::U64(v) => v.to_le_bytes().to_vec(),
            AttributeValue::F32(v) => v.to_le_bytes().to_vec(),
            AttributeValue::F64(v) => v.to_le_bytes().to_vec(),
            AttributeValue::Str(s) if s.is_empty() => vec![0u8],
            AttributeValue::Str(s) => s.as_bytes().to_vec(),
        }
    }

    /// Decodes a payload previously produced by [`Self::encode`], given
    /// the type-name tag it was written under.
    pub fn decode(type_name: &str, bytes: &[u8]) -> Result<Self, VoxError> {
        fn fixed<const N: usize>(bytes: &[u8], type_name: &str) -> Result<[u8; N], VoxError> {
            bytes.try_into().map_err(|_| VoxError::InputMalformed {
                reason: format!("attribute of type `{type_name}` has a {}-byte payload, expected {N}", bytes.len()),
            })
        }
        match type_name {
            "bool" => Ok(AttributeValue::Bool(*bytes.first().unwrap_or(&0) != 0)),
            "i32" => Ok(AttributeValue::I32(i32::from_le_bytes(fixed(bytes, type_name)?))),
            "i64" => Ok(AttributeValue::I64(i64::from_le_bytes(fixed(bytes, type_name)?))),
            "u32" => Ok(AttributeValue::U32(u32::from_le_bytes(fixed(bytes, type_name)?))),
            "u64" => Ok(AttributeValue::U64(u64::from_le_bytes(fixed(bytes, type_name)?))),
            "f32" => Ok(AttributeValue::F32(f32::from_le_bytes(fixed(bytes, type_name)?))),
            "f64" => Ok(AttributeValue::F64(f64::from_le_bytes(fixed(bytes, type_name)?))),
            "str" => {
                if bytes == [0u8] {
                    Ok(AttributeValue::Str(String::new()))
                } else {
                    String::from_utf8(bytes.to_vec())
                        .map(AttributeValue::Str)
                        .map_err(|_| VoxError::InputMalformed { reason: "attribute `str` payload is not valid utf-8".into() })
                }
            }
            other => Err(VoxError::InvalidType { name: other.to_string() }),
        }
    }
}

/// The process-wide mapping from type-name to the fact that it is a
/// known, decodable attribute type. Registration, lookup, and clearing
/// are all serialised through one mutex.
static REGISTRY: OnceLock<Mutex<HashMap<String, ()>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, ()>> {
    REGISTRY.get_or_init(|| Mutex::new(builtin_types()))
}

fn builtin_types() -> HashMap<String, ()> {
    ["bool", "i32", "i64", "u32", "u64", "f32", "f64", "str"]
        .into_iter()
        .map(|name| (name.to_string(), ()))
        .collect()
}

/// Registers a new attribute type name. Errors if the name is already
/// registered — the registry rejects double registration rather than
/// silently overwriting it.
pub fn register_attribute_type(name: &str) -> Result<(), VoxError> {
    let mut reg = registry().lock().expect("attribute registry poisoned");
    if reg.contains_key(name) {
        return Err(VoxError::InvalidType { name: name.to_string() });
    }
    reg.insert(name.to_string(), ());
    Ok(())
}

/// Removes a previously registered attribute type name.
pub fn unregister_attribute_type(name: &str) -> Result<(), VoxError> {
    let mut reg = registry().lock().expect("attribute registry poisoned");
    if reg.remove(name).is_none() {
        return Err(VoxError::InvalidType { name: name.to_string() });
    }
    Ok(())
}

pub fn is_attribute_type_registered(name: &str) -> bool {
    registry().lock().expect("attribute registry poisoned").contains_key(name)
}

/// Resets the registry back to just the built-in scalar/string types.
/// Exposed for test isolation between independent test cases.
pub fn clear_attribute_registry() {
    *registry().lock().expect("attribute registry poisoned") = builtin_types();
}

/// A name -> typed-attribute mapping persisted alongside a volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    entries: std::collections::BTreeMap<String, AttributeValue>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `name` and checks its stored type tag matches `expected`
    /// before handing back the opaque payload to decode.
    pub fn typed_payload(&self, name: &str, expected: &str) -> Result<Vec<u8>, VoxError> {
        let value = self.entries.get(name).ok_or_else(|| VoxError::InvalidType { name: name.to_string() })?;
        if value.type_name() != expected {
            return Err(VoxError::TypeMismatch {
                expected: expected.to_string(),
                found: value.type_name().to_string(),
            });
        }
        Ok(value.encode())
    }
}
