//! Service locator: lazily realized, named components
//!
//! Unlike [`Container::get`], a locator entry is realized at most once and
//! then shared for every later lookup, whatever its definition looks like.

use crate::container::Container;
use crate::definition::Definition;
use crate::error::{DiError, DiResult};
use crate::service::Object;
use crate::value::Params;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Named components backed by a container for instantiation
#[derive(Clone)]
pub struct ServiceLocator {
    container: Container,
    /// Realized components
    components: Arc<RwLock<FxHashMap<String, Object>>>,
    /// Component definitions by id
    definitions: Arc<RwLock<FxHashMap<String, Definition>>>,
}

impl ServiceLocator {
    /// Locator realizing definitions through `container`
    pub fn new(container: Container) -> Self {
        Self {
            container,
            components: Arc::new(RwLock::new(FxHashMap::default())),
            definitions: Arc::new(RwLock::new(FxHashMap::default())),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Register a component definition, dropping any realized instance for `id`.
    /// `Definition::Empty` removes the component instead.
    pub fn set(&self, id: &str, definition: impl Into<Definition>) -> DiResult<()> {
        let definition = definition.into();
        match &definition {
            Definition::Empty => {
                self.unset(id);
                return Ok(());
            }
            Definition::Config(record) if record.class.is_none() => {
                return Err(DiError::invalid_definition(
                    id,
                    "the configuration for the component must contain a \"class\" element",
                ))
            }
            _ => {}
        }

        {
            let mut components = self.components.write();
            match &definition {
                Definition::Instance(object) => {
                    components.insert(id.to_string(), object.clone());
                }
                _ => {
                    components.remove(id);
                }
            }
        }
        self.definitions.write().insert(id.to_string(), definition);
        debug!("Set component definition: {}", id);
        Ok(())
    }

    /// Register several components; stops at the first invalid one
    pub fn set_components<I, D>(&self, components: I) -> DiResult<()>
    where
        I: IntoIterator<Item = (String, D)>,
        D: Into<Definition>,
    {
        for (id, definition) in components {
            self.set(&id, definition)?;
        }
        Ok(())
    }

    /// Whether `id` is defined; with `check_built`, whether it is realized
    pub fn has(&self, id: &str, check_built: bool) -> bool {
        if check_built {
            self.components.read().contains_key(id)
        } else {
            self.definitions.read().contains_key(id)
        }
    }

    /// Realize `id`, failing with `UnknownComponent` when it is not defined
    pub fn get(&self, id: &str) -> DiResult<Object> {
        self.try_get(id)?.ok_or_else(|| DiError::UnknownComponent { id: id.to_string() })
    }

    /// Realize `id`, returning `None` when it is not defined
    pub fn try_get(&self, id: &str) -> DiResult<Option<Object>> {
        if let Some(component) = self.components.read().get(id) {
            return Ok(Some(component.clone()));
        }

        let definition = match self.definitions.read().get(id).cloned() {
            Some(definition) => definition,
            None => return Ok(None),
        };
        let object = match definition {
            Definition::Instance(object) => object,
            other => self.container.create_object(other, Params::new())?,
        };

        let object = self
            .components
            .write()
            .entry(id.to_string())
            .or_insert(object)
            .clone();
        debug!("Realized component: {}", id);
        Ok(Some(object))
    }

    /// Remove the definition and the realized instance for `id`
    pub fn unset(&self, id: &str) {
        self.definitions.write().remove(id);
        self.components.write().remove(id);
        debug!("Removed component: {}", id);
    }

    /// Alias of [`ServiceLocator::unset`]
    pub fn clear(&self, id: &str) {
        self.unset(id);
    }

    pub fn definition(&self, id: &str) -> Option<Definition> {
        self.definitions.read().get(id).cloned()
    }

    /// Snapshot of component definitions
    pub fn definitions(&self) -> FxHashMap<String, Definition> {
        self.definitions.read().clone()
    }

    /// Snapshot of realized components
    pub fn components(&self) -> FxHashMap<String, Object> {
        self.components.read().clone()
    }

    pub fn component_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("components", &self.component_ids())
            .finish()
    }
}
