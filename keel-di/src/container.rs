//! Core container implementation

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;
use tracing::{debug, trace, warn};

use crate::definition::{normalize, Definition, Recipe};
use crate::error::{DiError, DiResult};
use crate::reflection::{
    shape_of, ConstructorParameter, ParamSpec, ParameterKind, ReflectionCache, Reflector,
    TypeRegistry,
};
use crate::service::Object;
use crate::value::{Args, Params, Properties, Value};

/// Tunables for resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Longest chain of nested `get` calls before resolution is aborted
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[derive(Clone)]
struct Entry {
    recipe: Recipe,
    params: Params,
}

struct ContainerInner {
    /// Normalized definitions and their fixed constructor params
    definitions: RwLock<FxHashMap<String, Entry>>,
    /// `None` marks a declared singleton that has not been built yet
    singletons: RwLock<FxHashMap<String, Option<Object>>>,
    reflection: ReflectionCache,
    /// Names currently being resolved, per thread
    resolving: Mutex<FxHashMap<ThreadId, Vec<String>>>,
    options: ContainerOptions,
}

/// Name-keyed dependency injection container.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Container with an empty type registry
    pub fn new() -> Self {
        Self::with_types(TypeRegistry::new())
    }

    /// Container reflecting over `types`
    pub fn with_types(types: TypeRegistry) -> Self {
        Self::with_reflector(Arc::new(types), ContainerOptions::default())
    }

    /// Container over any reflector
    pub fn with_reflector(reflector: Arc<dyn Reflector>, options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                definitions: RwLock::new(FxHashMap::default()),
                singletons: RwLock::new(FxHashMap::default()),
                reflection: ReflectionCache::new(reflector),
                resolving: Mutex::new(FxHashMap::default()),
                options,
            }),
        }
    }

    /// Create a new container builder
    pub fn builder() -> crate::builder::ContainerBuilder {
        crate::builder::ContainerBuilder::new()
    }

    pub fn options(&self) -> ContainerOptions {
        self.inner.options
    }

    /// Constructor-shape cache used by this container
    pub fn reflection(&self) -> &ReflectionCache {
        &self.inner.reflection
    }

    /// Register a definition; clears any memoized singleton for `name`
    pub fn register(&self, name: &str, definition: impl Into<Definition>) -> DiResult<&Self> {
        self.register_with_params(name, definition, Params::new())
    }

    /// Register a definition with fixed constructor params
    pub fn register_with_params(
        &self,
        name: &str,
        definition: impl Into<Definition>,
        params: Params,
    ) -> DiResult<&Self> {
        let recipe = normalize(name, definition.into())?;
        self.inner
            .definitions
            .write()
            .insert(name.to_string(), Entry { recipe, params });
        self.inner.singletons.write().remove(name);
        debug!("Registered definition: {}", name);
        Ok(self)
    }

    /// Register a definition whose first built instance is reused
    pub fn register_singleton(&self, name: &str, definition: impl Into<Definition>) -> DiResult<&Self> {
        self.register_singleton_with_params(name, definition, Params::new())
    }

    pub fn register_singleton_with_params(
        &self,
        name: &str,
        definition: impl Into<Definition>,
        params: Params,
    ) -> DiResult<&Self> {
        let recipe = normalize(name, definition.into())?;
        self.inner
            .definitions
            .write()
            .insert(name.to_string(), Entry { recipe, params });
        self.inner.singletons.write().insert(name.to_string(), None);
        debug!("Registered singleton definition: {}", name);
        Ok(self)
    }

    /// Register many definitions; stops at the first invalid one
    pub fn set_definitions<I, D>(&self, definitions: I) -> DiResult<&Self>
    where
        I: IntoIterator<Item = (String, D)>,
        D: Into<Definition>,
    {
        for (name, definition) in definitions {
            self.register(&name, definition)?;
        }
        Ok(self)
    }

    /// Register many singleton definitions; stops at the first invalid one
    pub fn set_singletons<I, D>(&self, definitions: I) -> DiResult<&Self>
    where
        I: IntoIterator<Item = (String, D)>,
        D: Into<Definition>,
    {
        for (name, definition) in definitions {
            self.register_singleton(&name, definition)?;
        }
        Ok(self)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.definitions.read().contains_key(name)
    }

    /// Whether `name` is a singleton; with `check_built`, whether it is already built
    pub fn has_singleton(&self, name: &str, check_built: bool) -> bool {
        match self.inner.singletons.read().get(name) {
            Some(slot) => !check_built || slot.is_some(),
            None => false,
        }
    }

    /// Remove the definition and any singleton memoization for `name`
    pub fn unregister(&self, name: &str) {
        self.inner.definitions.write().remove(name);
        self.inner.singletons.write().remove(name);
        debug!("Unregistered definition: {}", name);
    }

    /// Normalized definition registered under `name`
    pub fn definition(&self, name: &str) -> Option<Recipe> {
        self.inner
            .definitions
            .read()
            .get(name)
            .map(|entry| entry.recipe.clone())
    }

    /// Snapshot of all registered definitions
    pub fn definitions(&self) -> FxHashMap<String, Recipe> {
        self.inner
            .definitions
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.recipe.clone()))
            .collect()
    }

    /// Resolve `name` with no extra params or config
    pub fn get(&self, name: &str) -> DiResult<Object> {
        self.get_with(name, Params::new(), Properties::new())
    }

    /// Resolve `name`. `params` and `config` only matter when an instance is
    /// actually built; a memoized singleton ignores them.
    pub fn get_with(&self, name: &str, params: Params, config: Properties) -> DiResult<Object> {
        if let Some(Some(object)) = self.inner.singletons.read().get(name) {
            trace!("Returning memoized singleton: {}", name);
            return Ok(object.clone());
        }

        let _frame = self.enter(name)?;
        let entry = self.inner.definitions.read().get(name).cloned();

        let object = match entry {
            None => self.build(name, params, config)?,
            Some(Entry {
                recipe: Recipe::Instance(object),
                ..
            }) => {
                self.inner
                    .singletons
                    .write()
                    .insert(name.to_string(), Some(object.clone()));
                return Ok(object);
            }
            Some(Entry {
                recipe: Recipe::Factory(factory),
                params: fixed,
            }) => {
                let params = self.resolve_params(fixed.merged(params))?;
                factory(self, params, config)?
            }
            Some(Entry {
                recipe: Recipe::Config { class, properties },
                params: fixed,
            }) => {
                let config = properties.merged(config);
                let params = fixed.merged(params);
                if class == name {
                    self.build(name, params, config)?
                } else {
                    self.get_with(&class, params, config)?
                }
            }
        };

        Ok(self.memoize(name, object))
    }

    /// Realize a loose definition without registering it
    pub fn create_object(&self, definition: impl Into<Definition>, params: Params) -> DiResult<Object> {
        match definition.into() {
            Definition::Class(class) => self.get_with(&class, params, Properties::new()),
            Definition::Config(record) => match record.class {
                Some(class) => self.get_with(&class, params, record.properties),
                None => Err(DiError::invalid_definition(
                    "<inline>",
                    "object configuration must contain a \"class\" element",
                )),
            },
            Definition::Factory(factory) => {
                let params = self.resolve_params(params)?;
                factory(self, params, Properties::new())
            }
            Definition::Instance(object) => Ok(object),
            Definition::Empty => Err(DiError::invalid_definition(
                "<inline>",
                "unsupported configuration type",
            )),
        }
    }

    /// Resolve `signature` the way constructor parameters are resolved and
    /// call `f` with the result
    pub fn invoke<R>(
        &self,
        name: &str,
        signature: &[ParamSpec],
        params: Params,
        f: impl FnOnce(Args) -> DiResult<R>,
    ) -> DiResult<R> {
        let parameters = shape_of(signature);
        let args = self.resolve_arguments(name, &parameters, params)?;
        f(args)
    }

    /// Store `object` if `name` is a pending singleton. Returns the instance
    /// callers must share, which is the earlier one if another thread won.
    fn memoize(&self, name: &str, object: Object) -> Object {
        let mut singletons = self.inner.singletons.write();
        let Some(slot) = singletons.get_mut(name) else {
            return object;
        };
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        *slot = Some(object.clone());
        debug!("Memoized singleton: {}", name);
        object
    }

    /// Build a concrete type directly from its descriptor
    fn build(&self, class: &str, params: Params, config: Properties) -> DiResult<Object> {
        let shape = self.inner.reflection.shape(class)?;
        let args = self.resolve_arguments(class, &shape.parameters, params)?;
        let properties = self.resolve_properties(config)?;
        let object = shape.descriptor.instantiate(args, properties)?;
        trace!("Built instance of {}", class);
        Ok(object)
    }

    fn resolve_arguments(
        &self,
        owner: &str,
        parameters: &[ConstructorParameter],
        mut params: Params,
    ) -> DiResult<Args> {
        let limit = parameters.len() + params.len();
        if let Some((position, _)) = params.iter().find(|(position, _)| *position >= limit) {
            return Err(DiError::InvalidArgument {
                type_name: owner.to_string(),
                position,
                expected: "a position within the declared and supplied parameters",
                found: format!(
                    "{} declared and {} supplied parameters",
                    parameters.len(),
                    params.len()
                ),
            });
        }

        let len = parameters.len().max(params.span());
        let mut values = Vec::with_capacity(len);

        for position in 0..len {
            let declared = parameters.get(position);
            let value = match (params.take(position), declared) {
                (Some(value), Some(parameter)) => self.resolve_supplied(owner, parameter, value)?,
                (Some(value), None) => self.resolve_value(value)?,
                (None, Some(parameter)) => self.resolve_parameter(owner, parameter)?,
                (None, None) => Value::null(),
            };
            values.push(value);
        }

        Ok(Args::new(Arc::from(owner), values))
    }

    /// A caller-supplied value for a declared parameter
    fn resolve_supplied(
        &self,
        owner: &str,
        parameter: &ConstructorParameter,
        value: Value,
    ) -> DiResult<Value> {
        let reference = match &value {
            Value::Reference(reference) => Some(reference.id().to_string()),
            _ => None,
        };
        let value = self.resolve_value(value)?;
        if let (
            Value::Object(object),
            ParameterKind::Dependency {
                target: Some(target),
                ..
            },
        ) = (&value, &parameter.kind)
        {
            let reference = reference.unwrap_or_else(|| format!("{}::{}", owner, parameter.name));
            check_type(reference, target, object)?;
        }
        Ok(value)
    }

    /// Fill a parameter nobody supplied
    fn resolve_parameter(&self, owner: &str, parameter: &ConstructorParameter) -> DiResult<Value> {
        match &parameter.kind {
            ParameterKind::Default(default) => self.resolve_value(default.clone()),
            ParameterKind::Dependency { target: None, .. } => {
                Err(DiError::MissingRequiredParameter {
                    parameter: parameter.name.clone(),
                    type_name: owner.to_string(),
                })
            }
            ParameterKind::Dependency {
                target: Some(target),
                nullable,
            } => match self.get(target) {
                Ok(object) => {
                    check_type(target.clone(), target, &object)?;
                    Ok(Value::Object(object))
                }
                Err(DiError::UnknownType { name }) if name == *target => {
                    if *nullable {
                        trace!("Optional dependency {} unavailable, passing null", target);
                        Ok(Value::null())
                    } else {
                        Err(DiError::UnresolvableDependency {
                            parameter: parameter.name.clone(),
                            type_name: owner.to_string(),
                            target: target.clone(),
                            source: Box::new(DiError::UnknownType { name }),
                        })
                    }
                }
                Err(err) => Err(err),
            },
        }
    }

    fn resolve_value(&self, value: Value) -> DiResult<Value> {
        match value {
            Value::Reference(reference) => reference.get(self, None).map(Value::Object),
            other => Ok(other),
        }
    }

    fn resolve_params(&self, params: Params) -> DiResult<Params> {
        params.map_values(|_, value| self.resolve_value(value))
    }

    fn resolve_properties(&self, config: Properties) -> DiResult<Properties> {
        let mut resolved = Properties::new();
        for (name, value) in config {
            resolved.set(&name, self.resolve_value(value)?);
        }
        Ok(resolved)
    }

    /// Push `name` on this thread's resolution stack
    fn enter(&self, name: &str) -> DiResult<ResolutionFrame<'_>> {
        let thread = std::thread::current().id();
        let mut resolving = self.inner.resolving.lock();
        let stack = resolving.entry(thread).or_default();

        if let Some(start) = stack.iter().position(|n| n == name) {
            let path = stack[start..]
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(name))
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!("Circular dependency detected: {}", path);
            return Err(DiError::CircularDependency { path });
        }

        let max_depth = self.inner.options.max_depth;
        if stack.len() >= max_depth {
            warn!("Resolution depth {} exceeded at {}", max_depth, name);
            if stack.is_empty() {
                resolving.remove(&thread);
            }
            return Err(DiError::ResolutionDepthExceeded {
                name: name.to_string(),
                depth: max_depth,
            });
        }

        stack.push(name.to_string());
        Ok(ResolutionFrame {
            container: self,
            thread,
        })
    }
}

fn check_type(reference: String, expected: &str, object: &Object) -> DiResult<()> {
    if object.is_instance_of(expected) {
        Ok(())
    } else {
        Err(DiError::TypeMismatch {
            reference,
            expected: expected.to_string(),
            actual: object.type_name().to_string(),
        })
    }
}

/// Pops its name off the resolution stack when dropped
struct ResolutionFrame<'a> {
    container: &'a Container,
    thread: ThreadId,
}

impl Drop for ResolutionFrame<'_> {
    fn drop(&mut self) {
        let mut resolving = self.container.inner.resolving.lock();
        if let Some(stack) = resolving.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                resolving.remove(&self.thread);
            }
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Container::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.inner.definitions.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Container")
            .field("definitions", &names)
            .field("options", &self.inner.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::TypeDescriptor;

    struct Counter(i64);

    fn counter_types() -> TypeRegistry {
        let types = TypeRegistry::new();
        types.register(
            TypeDescriptor::builder::<Counter>("app::Counter")
                .param(ParamSpec::with_default("start", 0))
                .construct(|args| Ok(Counter(args.i64(0)?))),
        );
        types
    }

    #[test]
    fn test_unregistered_name_builds_directly() {
        let container = Container::with_types(counter_types());
        let counter = container.get("app::Counter").unwrap();
        assert_eq!(counter.downcast::<Counter>().unwrap().0, 0);
        assert!(!container.has("app::Counter"));
    }

    #[test]
    fn test_resolution_stack_is_cleared_after_errors() {
        let container = Container::with_types(counter_types());
        assert!(container.get("app::Missing").is_err());
        assert!(container.inner.resolving.lock().is_empty());
        assert!(container.get("app::Counter").is_ok());
    }

    #[test]
    fn test_fixed_params_are_stored_per_name() {
        let container = Container::with_types(counter_types());
        container
            .register_with_params("ten", "app::Counter", Params::new().at(0, 10))
            .unwrap();

        let ten = container.get("ten").unwrap();
        assert_eq!(ten.downcast::<Counter>().unwrap().0, 10);

        let eleven = container
            .get_with("ten", Params::new().at(0, 11), Properties::new())
            .unwrap();
        assert_eq!(eleven.downcast::<Counter>().unwrap().0, 11);
    }

    #[test]
    fn test_depth_bound() {
        let container = Container::with_reflector(
            Arc::new(counter_types()),
            ContainerOptions { max_depth: 2 },
        );
        container.register("a", "b").unwrap();
        container.register("b", "app::Counter").unwrap();
        assert!(matches!(
            container.get("a"),
            Err(DiError::ResolutionDepthExceeded { depth: 2, .. })
        ));

        container.register("a", "app::Counter").unwrap();
        assert!(container.get("a").is_ok());
    }

    #[test]
    fn test_singleton_marker_states() {
        let container = Container::with_types(counter_types());
        container.register_singleton("counter", "app::Counter").unwrap();

        assert!(container.has_singleton("counter", false));
        assert!(!container.has_singleton("counter", true));

        container.get("counter").unwrap();
        assert!(container.has_singleton("counter", true));

        container.register("counter", "app::Counter").unwrap();
        assert!(!container.has_singleton("counter", false));
    }
}
