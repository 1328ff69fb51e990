//! Configuration-based registration
//!
//! Example configuration file format:
//!
//! ```toml
//! [options]
//! max_depth = 32
//!
//! [definitions."app::Logger"]
//! class = "app::FileLogger"
//! singleton = true
//! params = ["/var/log/app.log"]
//!
//! [definitions."app::Mailer".properties]
//! host = "smtp.local"
//! logger = { "$ref" = "app::Logger" }
//!
//! [components.db]
//! class = "app::Connection"
//! properties = { dsn = "sqlite::memory:" }
//! ```

use crate::container::{Container, ContainerOptions};
use crate::definition::{ConfigRecord, Definition};
use crate::error::{DiError, DiResult};
use crate::locator::ServiceLocator;
use crate::reflection::TypeRegistry;
use crate::value::{Params, Properties, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// One container definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionConfig {
    /// Concrete type or alias target; defaults to the definition name
    #[serde(default)]
    pub class: Option<String>,
    /// Register as a singleton
    #[serde(default)]
    pub singleton: bool,
    /// Fixed positional constructor parameters
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    /// Initial property values
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// One service locator component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub class: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Container configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(default)]
    pub options: ContainerOptions,
    #[serde(default)]
    pub definitions: BTreeMap<String, DefinitionConfig>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentConfig>,
}

fn properties_from(map: &serde_json::Map<String, serde_json::Value>) -> Properties {
    map.iter()
        .map(|(name, value)| (name.clone(), Value::from_config_literal(value.clone())))
        .collect()
}

impl DefinitionConfig {
    fn to_definition(&self) -> (Definition, Params) {
        let record = ConfigRecord {
            class: self.class.clone(),
            properties: properties_from(&self.properties),
        };
        let params = Params::from(
            self.params
                .iter()
                .cloned()
                .map(Value::from_config_literal)
                .collect::<Vec<_>>(),
        );
        (Definition::Config(record), params)
    }
}

impl ComponentConfig {
    fn to_definition(&self) -> Definition {
        Definition::Config(ConfigRecord {
            class: Some(self.class.clone()),
            properties: properties_from(&self.properties),
        })
    }
}

impl ContainerConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DiError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            Some("json") => Self::from_json(&contents),
            _ => Err(DiError::ConfigError(format!(
                "Unsupported configuration format: {}",
                path.display()
            ))),
        }
    }

    /// Register every definition on `container`
    pub fn apply(&self, container: &Container) -> DiResult<()> {
        for (name, config) in &self.definitions {
            let (definition, params) = config.to_definition();
            if config.singleton {
                container.register_singleton_with_params(name, definition, params)?;
            } else {
                container.register_with_params(name, definition, params)?;
            }
        }
        info!("Applied {} definitions", self.definitions.len());
        Ok(())
    }

    /// Register every component on `locator`
    pub fn apply_to_locator(&self, locator: &ServiceLocator) -> DiResult<()> {
        for (id, config) in &self.components {
            locator.set(id, config.to_definition())?;
        }
        info!("Applied {} components", self.components.len());
        Ok(())
    }

    /// Build a container over `types` with these options and definitions
    pub fn build_container(&self, types: TypeRegistry) -> DiResult<Container> {
        let container = Container::with_reflector(Arc::new(types), self.options);
        self.apply(&container)?;
        Ok(container)
    }

    /// Build a container and a locator on top of it
    pub fn build_locator(&self, types: TypeRegistry) -> DiResult<ServiceLocator> {
        let locator = ServiceLocator::new(self.build_container(types)?);
        self.apply_to_locator(&locator)?;
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Recipe;

    #[test]
    fn test_parse_toml() {
        let config = ContainerConfig::from_toml(
            r#"
            [options]
            max_depth = 12

            [definitions."app::Logger"]
            class = "app::FileLogger"
            singleton = true
            params = ["/var/log/app.log", 3]

            [definitions.mailer]
            class = "app::Mailer"
            properties = { host = "smtp.local", logger = { "$ref" = "app::Logger" } }

            [components.db]
            class = "app::Connection"
            "#,
        )
        .unwrap();

        assert_eq!(config.options.max_depth, 12);
        assert_eq!(config.definitions.len(), 2);
        assert!(config.definitions["app::Logger"].singleton);
        assert_eq!(config.components["db"].class, "app::Connection");

        let (definition, params) = config.definitions["mailer"].to_definition();
        assert_eq!(params.len(), 0);
        match definition {
            Definition::Config(record) => {
                assert_eq!(record.class.as_deref(), Some("app::Mailer"));
                assert!(matches!(
                    record.properties.get("logger"),
                    Some(Value::Reference(r)) if r.id() == "app::Logger"
                ));
            }
            other => panic!("unexpected definition {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_defaults() {
        let config = ContainerConfig::from_json(r#"{"definitions": {"app::Cache": {}}}"#).unwrap();

        assert_eq!(config.options, ContainerOptions::default());
        assert!(!config.definitions["app::Cache"].singleton);
        assert!(config.components.is_empty());
    }

    #[test]
    fn test_apply_registers_definitions() {
        let config = ContainerConfig::from_json(
            r#"{"definitions": {
                "app::Cache": {"singleton": true},
                "cache": {"class": "app::Cache"}
            }}"#,
        )
        .unwrap();
        let container = Container::new();
        config.apply(&container).unwrap();

        assert!(container.has_singleton("app::Cache", false));
        assert!(matches!(
            container.definition("cache"),
            Some(Recipe::Config { class, .. }) if class == "app::Cache"
        ));
    }

    #[test]
    fn test_unqualified_name_without_class_is_rejected() {
        let config = ContainerConfig::from_json(r#"{"definitions": {"cache": {}}}"#).unwrap();
        assert!(matches!(
            config.apply(&Container::new()),
            Err(DiError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            ContainerConfig::from_json("{"),
            Err(DiError::ConfigError(_))
        ));
        assert!(matches!(
            ContainerConfig::from_file("/nonexistent/keel.yaml"),
            Err(DiError::ConfigError(_))
        ));
    }
}
