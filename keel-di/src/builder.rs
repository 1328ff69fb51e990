//! Container builder for fluent configuration

use std::sync::Arc;

use crate::container::{Container, ContainerOptions};
use crate::definition::Definition;
use crate::error::DiResult;
use crate::reflection::{Reflector, TypeDescriptor, TypeRegistry};
use crate::value::Params;

/// Registration queued until `build`
enum Pending {
    Plain(String, Definition, Params),
    Singleton(String, Definition, Params),
}

/// Builder for constructing a container
pub struct ContainerBuilder {
    types: TypeRegistry,
    reflector: Option<Arc<dyn Reflector>>,
    options: ContainerOptions,
    pending: Vec<Pending>,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::new(),
            reflector: None,
            options: ContainerOptions::default(),
            pending: Vec::new(),
        }
    }

    /// Describe a buildable type
    pub fn register_type(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.register(descriptor);
        self
    }

    /// Use an existing type registry (shared with the caller)
    pub fn with_types(&mut self, types: TypeRegistry) -> &mut Self {
        self.types = types;
        self
    }

    /// Use a custom reflector; registered types are then ignored
    pub fn with_reflector(&mut self, reflector: Arc<dyn Reflector>) -> &mut Self {
        self.reflector = Some(reflector);
        self
    }

    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Queue a plain definition
    pub fn register(&mut self, name: &str, definition: impl Into<Definition>) -> &mut Self {
        self.register_with_params(name, definition, Params::new())
    }

    pub fn register_with_params(
        &mut self,
        name: &str,
        definition: impl Into<Definition>,
        params: Params,
    ) -> &mut Self {
        self.pending
            .push(Pending::Plain(name.to_string(), definition.into(), params));
        self
    }

    /// Queue a singleton definition
    pub fn register_singleton(&mut self, name: &str, definition: impl Into<Definition>) -> &mut Self {
        self.register_singleton_with_params(name, definition, Params::new())
    }

    pub fn register_singleton_with_params(
        &mut self,
        name: &str,
        definition: impl Into<Definition>,
        params: Params,
    ) -> &mut Self {
        self.pending
            .push(Pending::Singleton(name.to_string(), definition.into(), params));
        self
    }

    /// Build the container, normalizing every queued definition
    pub fn build(self) -> DiResult<Container> {
        let reflector = self
            .reflector
            .unwrap_or_else(|| Arc::new(self.types) as Arc<dyn Reflector>);
        let container = Container::with_reflector(reflector, self.options);

        for pending in self.pending {
            match pending {
                Pending::Plain(name, definition, params) => {
                    container.register_with_params(&name, definition, params)?;
                }
                Pending::Singleton(name, definition, params) => {
                    container.register_singleton_with_params(&name, definition, params)?;
                }
            }
        }

        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension methods for fluent builder pattern
impl ContainerBuilder {
    /// Add multiple registrations using a configuration function
    pub fn add_services<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        configure(&mut self);
        self
    }

    /// Add registrations from a module
    pub fn add_module<M: Module>(mut self, module: M) -> Self {
        module.configure(&mut self);
        self
    }
}

/// A group of related type descriptors and definitions
pub trait Module {
    /// Configure services for this module
    fn configure(&self, builder: &mut ContainerBuilder);
}
