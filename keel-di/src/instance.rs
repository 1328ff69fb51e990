//! Dependency references: "substitute the instance registered under this name"

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::locator::ServiceLocator;
use crate::service::Object;
use crate::value::{Params, Properties, Value};
use std::fmt;
use tracing::trace;

/// A placeholder resolved against a container (or locator) at use time
#[derive(Clone)]
pub struct Instance {
    id: String,
    container: Option<Container>,
}

impl Instance {
    /// Reference a component id, class, interface, or alias
    pub fn of(id: &str) -> Self {
        Self {
            id: id.to_string(),
            container: None,
        }
    }

    /// Reference that always resolves against `container`
    pub fn in_container(id: &str, container: Container) -> Self {
        Self {
            id: id.to_string(),
            container: Some(container),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Realize the reference.
    ///
    /// A pinned container wins; otherwise the locator is consulted when it
    /// has the id, and `container` is the last resort.
    pub fn get(&self, container: &Container, locator: Option<&ServiceLocator>) -> DiResult<Object> {
        if let Some(pinned) = &self.container {
            return pinned.get(&self.id);
        }
        if let Some(locator) = locator {
            if locator.has(&self.id, false) {
                trace!("Resolving reference {} through the locator", self.id);
                return locator.get(&self.id);
            }
        }
        container.get(&self.id)
    }

    /// Turn `value` into an object, checking it against `expected`.
    ///
    /// Accepts built objects, references, component ids given as strings,
    /// and literal config maps (`"class"` picks the type, falling back to
    /// `expected`; the remaining keys become properties).
    pub fn ensure(
        value: impl Into<Value>,
        expected: Option<&str>,
        container: &Container,
        locator: Option<&ServiceLocator>,
    ) -> DiResult<Object> {
        let (object, reference) = match value.into() {
            Value::Object(object) => (object, None),
            Value::Reference(reference) => {
                let object = reference.get(container, locator)?;
                (object, Some(reference.id))
            }
            Value::Literal(serde_json::Value::String(id)) => {
                let object = Instance::of(&id).get(container, locator)?;
                (object, Some(id))
            }
            Value::Literal(serde_json::Value::Object(mut map)) => {
                let class = match map.remove("class") {
                    Some(serde_json::Value::String(class)) => class,
                    Some(_) => {
                        return Err(DiError::invalid_definition(
                            expected.unwrap_or("<inline>"),
                            "\"class\" must be a string",
                        ))
                    }
                    None => match expected {
                        Some(expected) => expected.to_string(),
                        None => {
                            return Err(DiError::invalid_definition(
                                "<inline>",
                                "config map needs a \"class\" key when no type is expected",
                            ))
                        }
                    },
                };
                let properties: Properties = map
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_config_literal(v)))
                    .collect();
                let object = container.get_with(&class, Params::new(), properties)?;
                (object, Some(class))
            }
            Value::Literal(serde_json::Value::Null) => {
                return Err(DiError::invalid_definition(
                    expected.unwrap_or("<inline>"),
                    "the required component is not specified",
                ))
            }
            other => {
                return Err(DiError::invalid_definition(
                    expected.unwrap_or("<inline>"),
                    format!("cannot make a component out of {}", other.describe()),
                ))
            }
        };

        if let Some(expected) = expected {
            if !object.is_instance_of(expected) {
                return Err(DiError::TypeMismatch {
                    reference: reference.unwrap_or_else(|| object.type_name().to_string()),
                    expected: expected.to_string(),
                    actual: object.type_name().to_string(),
                });
            }
        }
        Ok(object)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("pinned", &self.container.is_some())
            .finish()
    }
}
