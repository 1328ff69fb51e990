//! Parameter and property payloads passed through the resolver

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::service::{Object, Service};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A constructor argument, factory parameter, or property value
#[derive(Debug, Clone)]
pub enum Value {
    /// Plain data
    Literal(serde_json::Value),
    /// An already built object
    Object(Object),
    /// Resolve this from a container at use time
    Reference(Instance),
}

impl Value {
    pub fn null() -> Self {
        Value::Literal(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Literal(serde_json::Value::Null))
    }

    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_literal().and_then(|v| v.as_str())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_literal().and_then(|v| v.as_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_literal().and_then(|v| v.as_f64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_literal().and_then(|v| v.as_bool())
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Value::Literal(serde_json::Value::Null) => "null".to_string(),
            Value::Literal(serde_json::Value::Bool(_)) => "bool".to_string(),
            Value::Literal(serde_json::Value::Number(_)) => "number".to_string(),
            Value::Literal(serde_json::Value::String(_)) => "string".to_string(),
            Value::Literal(serde_json::Value::Array(_)) => "array".to_string(),
            Value::Literal(serde_json::Value::Object(_)) => "map".to_string(),
            Value::Object(o) => format!("object of {}", o.type_name()),
            Value::Reference(r) => format!("reference to {}", r.id()),
        }
    }

    /// Deserialize a literal into a typed value
    pub fn deserialize<T: DeserializeOwned>(&self) -> Option<T> {
        self.as_literal()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Interpret a top-level `{"$ref": "name"}` literal as a reference.
    /// Used by declarative configuration.
    pub fn from_config_literal(value: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(id)) = map.get("$ref") {
                    return Value::Reference(Instance::of(id));
                }
            }
        }
        Value::Literal(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Literal(v)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Instance> for Value {
    fn from(r: Instance) -> Self {
        Value::Reference(r)
    }
}

macro_rules! literal_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Literal(serde_json::Value::from(v))
                }
            }
        )*
    };
}

literal_from!(bool, i32, i64, u32, u64, usize, f64, String, &str);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or_else(Value::null, Into::into)
    }
}

/// Positional parameters keyed by index; absent indices keep their defaults
#[derive(Debug, Clone, Default)]
pub struct Params(BTreeMap<usize, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value at `position`
    pub fn at(mut self, position: usize, value: impl Into<Value>) -> Self {
        self.0.insert(position, value.into());
        self
    }

    pub fn insert(&mut self, position: usize, value: impl Into<Value>) {
        self.0.insert(position, value.into());
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(&position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One past the highest index carried, saturating at `usize::MAX`
    pub fn span(&self) -> usize {
        self.0
            .keys()
            .next_back()
            .map_or(0, |last| last.checked_add(1).unwrap_or(usize::MAX))
    }

    /// Overlay `other` on top of `self`; `other` wins at shared indices
    pub fn merged(mut self, other: Params) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn take(&mut self, position: usize) -> Option<Value> {
        self.0.remove(&position)
    }

    pub(crate) fn map_values(
        self,
        mut f: impl FnMut(usize, Value) -> DiResult<Value>,
    ) -> DiResult<Self> {
        let mut out = BTreeMap::new();
        for (position, value) in self.0 {
            out.insert(position, f(position, value)?);
        }
        Ok(Params(out))
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params(values.into_iter().enumerate().collect())
    }
}

impl FromIterator<(usize, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (usize, Value)>>(iter: I) -> Self {
        Params(iter.into_iter().collect())
    }
}

/// Ordered property bag; setting an existing key replaces it in place
#[derive(Debug, Clone, Default)]
pub struct Properties(Vec<(String, Value)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into `self`; `other` wins on key collisions
    pub fn merged(mut self, other: Properties) -> Self {
        for (name, value) in other.0 {
            self.set(&name, value);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Properties {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            let k = k.into();
            props.set(&k, v);
        }
        props
    }
}

/// Fully resolved positional arguments handed to a constructor or callable
#[derive(Debug, Clone)]
pub struct Args {
    owner: Arc<str>,
    values: Vec<Value>,
}

impl Args {
    pub(crate) fn new(owner: Arc<str>, values: Vec<Value>) -> Self {
        Self { owner, values }
    }

    /// Name of the type or callable these arguments are for
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn mismatch(&self, position: usize, expected: &'static str) -> DiError {
        DiError::InvalidArgument {
            type_name: self.owner.to_string(),
            position,
            expected,
            found: self
                .values
                .get(position)
                .map_or_else(|| "nothing".to_string(), Value::describe),
        }
    }

    pub fn value(&self, position: usize) -> DiResult<&Value> {
        self.values
            .get(position)
            .ok_or_else(|| self.mismatch(position, "a value"))
    }

    pub fn is_null(&self, position: usize) -> bool {
        self.values.get(position).map_or(true, Value::is_null)
    }

    pub fn str(&self, position: usize) -> DiResult<&str> {
        self.value(position)?
            .as_str()
            .ok_or_else(|| self.mismatch(position, "a string"))
    }

    pub fn string(&self, position: usize) -> DiResult<String> {
        self.str(position).map(str::to_string)
    }

    pub fn i64(&self, position: usize) -> DiResult<i64> {
        self.value(position)?
            .as_i64()
            .ok_or_else(|| self.mismatch(position, "an integer"))
    }

    pub fn f64(&self, position: usize) -> DiResult<f64> {
        self.value(position)?
            .as_f64()
            .ok_or_else(|| self.mismatch(position, "a number"))
    }

    pub fn bool(&self, position: usize) -> DiResult<bool> {
        self.value(position)?
            .as_bool()
            .ok_or_else(|| self.mismatch(position, "a bool"))
    }

    pub fn deserialize<T: DeserializeOwned>(&self, position: usize) -> DiResult<T> {
        self.value(position)?
            .deserialize()
            .ok_or_else(|| self.mismatch(position, "deserializable data"))
    }

    pub fn object(&self, position: usize) -> DiResult<&Object> {
        self.value(position)?
            .as_object()
            .ok_or_else(|| self.mismatch(position, "an object"))
    }

    /// Downcast an object argument to its concrete type
    pub fn get<T: Service>(&self, position: usize) -> DiResult<Arc<T>> {
        self.object(position)?
            .downcast::<T>()
            .ok_or_else(|| self.mismatch(position, std::any::type_name::<T>()))
    }

    /// View an object argument through a trait object
    pub fn interface<I: ?Sized + Send + Sync + 'static>(&self, position: usize) -> DiResult<Arc<I>> {
        self.object(position)?
            .cast::<I>()
            .ok_or_else(|| self.mismatch(position, std::any::type_name::<I>()))
    }

    /// Like `get`, but null yields `None`
    pub fn optional<T: Service>(&self, position: usize) -> DiResult<Option<Arc<T>>> {
        if self.is_null(position) {
            return Ok(None);
        }
        self.get(position).map(Some)
    }

    /// Like `interface`, but null yields `None`
    pub fn optional_interface<I: ?Sized + Send + Sync + 'static>(
        &self,
        position: usize,
    ) -> DiResult<Option<Arc<I>>> {
        if self.is_null(position) {
            return Ok(None);
        }
        self.interface(position).map(Some)
    }
}
