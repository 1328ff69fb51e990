//! Definitions: how to produce an instance for a registered name

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::service::Object;
use crate::value::{Params, Properties, Value};
use std::fmt;
use std::sync::Arc;

/// Factory receiving the container, resolved params, and call-site config
pub type Factory = Arc<dyn Fn(&Container, Params, Properties) -> DiResult<Object> + Send + Sync>;

/// A concrete type selector plus initial property values
#[derive(Debug, Clone, Default)]
pub struct ConfigRecord {
    pub class: Option<String>,
    pub properties: Properties,
}

impl ConfigRecord {
    /// Record without a type; only valid under a qualified name
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.set(name, value);
        self
    }
}

/// Definition as supplied by callers, before normalization
#[derive(Clone, Default)]
pub enum Definition {
    /// Build the registered name itself
    #[default]
    Empty,
    /// Build this concrete type (or resolve this alias)
    Class(String),
    Config(ConfigRecord),
    Factory(Factory),
    /// A ready-made object, shared like a singleton
    Instance(Object),
}

impl Definition {
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Container, Params, Properties) -> DiResult<Object> + Send + Sync + 'static,
    {
        Definition::Factory(Arc::new(factory))
    }
}

impl From<&str> for Definition {
    fn from(class: &str) -> Self {
        Definition::Class(class.to_string())
    }
}

impl From<String> for Definition {
    fn from(class: String) -> Self {
        Definition::Class(class)
    }
}

impl From<ConfigRecord> for Definition {
    fn from(record: ConfigRecord) -> Self {
        Definition::Config(record)
    }
}

impl From<Object> for Definition {
    fn from(object: Object) -> Self {
        Definition::Instance(object)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Empty => f.write_str("Empty"),
            Definition::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Definition::Config(record) => f.debug_tuple("Config").field(record).finish(),
            Definition::Factory(_) => f.write_str("Factory(..)"),
            Definition::Instance(object) => f.debug_tuple("Instance").field(object).finish(),
        }
    }
}

/// Normalized definition as stored in the registry
#[derive(Clone)]
pub enum Recipe {
    Factory(Factory),
    Config { class: String, properties: Properties },
    Instance(Object),
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipe::Factory(_) => f.write_str("Factory(..)"),
            Recipe::Config { class, properties } => f
                .debug_struct("Config")
                .field("class", class)
                .field("properties", properties)
                .finish(),
            Recipe::Instance(object) => f.debug_tuple("Instance").field(object).finish(),
        }
    }
}

/// True when `name` carries a namespace separator
pub fn is_qualified(name: &str) -> bool {
    name.contains("::") || name.contains('\\')
}

/// Normalize a definition registered under `name`
pub fn normalize(name: &str, definition: Definition) -> DiResult<Recipe> {
    match definition {
        Definition::Empty => Ok(Recipe::Config {
            class: name.to_string(),
            properties: Properties::new(),
        }),
        Definition::Class(class) if class.is_empty() => {
            Err(DiError::invalid_definition(name, "type name is empty"))
        }
        Definition::Class(class) => Ok(Recipe::Config {
            class,
            properties: Properties::new(),
        }),
        Definition::Config(ConfigRecord { class, properties }) => {
            let class = match class {
                Some(class) if !class.is_empty() => class,
                _ if is_qualified(name) => name.to_string(),
                _ => {
                    return Err(DiError::invalid_definition(
                        name,
                        "a \"class\" element is required",
                    ))
                }
            };
            Ok(Recipe::Config { class, properties })
        }
        Definition::Factory(factory) => Ok(Recipe::Factory(factory)),
        Definition::Instance(object) => Ok(Recipe::Instance(object)),
    }
}
