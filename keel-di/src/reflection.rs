//! Type descriptors and the constructor-shape cache
//!
//! Rust has no runtime constructor introspection, so every buildable type is
//! described once through a [`TypeBuilder`]: its name, the ordered constructor
//! parameters (with defaults and type hints), the interfaces it satisfies, and
//! the constructor itself. A [`Reflector`] answers lookups by name and the
//! [`ReflectionCache`] memoizes the derived parameter list per type.

use crate::configurable::{configure, Configurable};
use crate::error::{DiError, DiResult};
use crate::service::{Interfaces, Object, Service};
use crate::value::{Args, Properties, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Declared metadata of one constructor or callable parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
    pub type_hint: Option<String>,
    pub nullable: bool,
}

impl ParamSpec {
    /// Untyped parameter without a default
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            type_hint: None,
            nullable: false,
        }
    }

    /// Parameter with a literal default
    pub fn with_default(name: &str, default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::required(name)
        }
    }

    /// Parameter type-hinted with a class or interface name
    pub fn typed(name: &str, type_name: &str) -> Self {
        Self {
            type_hint: Some(type_name.to_string()),
            ..Self::required(name)
        }
    }

    /// Resolve to null when the hinted type cannot be located
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// How the resolver fills a parameter nobody supplied
#[derive(Debug, Clone)]
pub enum ParameterKind {
    /// Use this literal
    Default(Value),
    /// Resolve `target` from the container; `None` means untyped
    Dependency {
        target: Option<String>,
        nullable: bool,
    },
}

/// One positional parameter of a constructor, as seen by the resolver
#[derive(Debug, Clone)]
pub struct ConstructorParameter {
    pub position: usize,
    pub name: String,
    pub kind: ParameterKind,
}

/// Classify declared parameters: defaults win over type hints
pub fn shape_of(specs: &[ParamSpec]) -> Vec<ConstructorParameter> {
    specs
        .iter()
        .enumerate()
        .map(|(position, spec)| {
            let kind = match (&spec.default, &spec.type_hint) {
                (Some(default), _) => ParameterKind::Default(default.clone()),
                (None, target) => ParameterKind::Dependency {
                    target: target.clone(),
                    nullable: spec.nullable,
                },
            };
            ConstructorParameter {
                position,
                name: spec.name.clone(),
                kind,
            }
        })
        .collect()
}

type BuildFn = Arc<dyn Fn(Args, Properties) -> DiResult<Arc<dyn Service>> + Send + Sync>;

/// Everything the container needs to know to instantiate a concrete type
pub struct TypeDescriptor {
    name: Arc<str>,
    params: Vec<ParamSpec>,
    interfaces: Arc<Interfaces>,
    configurable: bool,
    build: BuildFn,
}

impl TypeDescriptor {
    /// Start describing `T` under `name`
    pub fn builder<T: Service>(name: &str) -> TypeBuilder<T> {
        TypeBuilder {
            name: name.to_string(),
            params: Vec::new(),
            interfaces: Interfaces::default(),
            configure: None,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn interfaces(&self) -> &[String] {
        self.interfaces.names()
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable
    }

    /// Run the constructor, apply properties, and wrap the result
    pub(crate) fn instantiate(&self, args: Args, properties: Properties) -> DiResult<Object> {
        if !self.configurable {
            if let Some((property, _)) = properties.iter().next() {
                return Err(DiError::InvalidProperty {
                    type_name: self.name.to_string(),
                    property: property.to_string(),
                    reason: "type does not accept properties".to_string(),
                });
            }
        }
        let value = (self.build)(args, properties)?;
        Ok(Object::from_parts(
            self.name.clone(),
            value,
            self.interfaces.clone(),
        ))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("interfaces", &self.interfaces)
            .field("configurable", &self.configurable)
            .finish()
    }
}

/// Typed builder for a [`TypeDescriptor`]
pub struct TypeBuilder<T> {
    name: String,
    params: Vec<ParamSpec>,
    interfaces: Interfaces,
    configure: Option<fn(&mut T, Properties) -> DiResult<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Service> TypeBuilder<T> {
    /// Append the next positional parameter
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declare an interface (or parent type) with a trait-object view
    pub fn implements<I, F>(mut self, name: &str, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.interfaces.add::<T, I, F>(name, cast);
        self
    }

    /// Declare an interface name used only for type checks
    pub fn implements_name(mut self, name: &str) -> Self {
        self.interfaces.add_name(name);
        self
    }

    /// Accept properties through [`Configurable`]
    pub fn configurable(mut self) -> Self
    where
        T: Configurable,
    {
        self.configure = Some(configure_properties::<T>);
        self
    }

    /// Finish with a constructor taking the resolved positional arguments
    pub fn construct<F>(self, constructor: F) -> TypeDescriptor
    where
        F: Fn(Args) -> DiResult<T> + Send + Sync + 'static,
    {
        let configure = self.configure;
        let build: BuildFn = Arc::new(
            move |args: Args, properties: Properties| -> DiResult<Arc<dyn Service>> {
                let mut value = constructor(args)?;
                if let Some(configure) = configure {
                    configure(&mut value, properties)?;
                }
                Ok(Arc::new(value) as Arc<dyn Service>)
            },
        );

        TypeDescriptor {
            name: Arc::from(self.name),
            params: self.params,
            interfaces: Arc::new(self.interfaces),
            configurable: configure.is_some(),
            build,
        }
    }

    /// Finish with `T::default()` as the constructor
    pub fn construct_default(self) -> TypeDescriptor
    where
        T: Default,
    {
        self.construct(|_| Ok(T::default()))
    }
}

fn configure_properties<T: Configurable>(target: &mut T, properties: Properties) -> DiResult<()> {
    configure(target, properties)
}

/// Source of type descriptors, keyed by concrete type name
pub trait Reflector: Send + Sync {
    fn describe(&self, type_name: &str) -> Option<Arc<TypeDescriptor>>;
}

/// Default reflector: an explicit, shareable registry of descriptors
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: Arc<RwLock<FxHashMap<String, Arc<TypeDescriptor>>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its own name, replacing any previous one
    pub fn register(&self, descriptor: TypeDescriptor) -> &Self {
        let name = descriptor.name().to_string();
        debug!("Registered type descriptor: {}", name);
        self.types.write().insert(name, Arc::new(descriptor));
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    pub fn names(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }
}

impl Reflector for TypeRegistry {
    fn describe(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(type_name).cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

/// A descriptor together with its classified constructor parameters
#[derive(Debug)]
pub struct TypeShape {
    pub descriptor: Arc<TypeDescriptor>,
    pub parameters: Vec<ConstructorParameter>,
}

/// Memoizes constructor shapes per type name for the container's lifetime
pub struct ReflectionCache {
    reflector: Arc<dyn Reflector>,
    shapes: RwLock<FxHashMap<String, Arc<TypeShape>>>,
}

impl ReflectionCache {
    pub fn new(reflector: Arc<dyn Reflector>) -> Self {
        Self {
            reflector,
            shapes: RwLock::new(FxHashMap::default()),
        }
    }

    /// Constructor shape for `type_name`, introspecting on first use
    pub fn shape(&self, type_name: &str) -> DiResult<Arc<TypeShape>> {
        if let Some(shape) = self.shapes.read().get(type_name) {
            trace!("Reflection cache hit for type: {}", type_name);
            return Ok(shape.clone());
        }

        let descriptor =
            self.reflector
                .describe(type_name)
                .ok_or_else(|| DiError::UnknownType {
                    name: type_name.to_string(),
                })?;
        let shape = Arc::new(TypeShape {
            parameters: shape_of(descriptor.params()),
            descriptor,
        });

        debug!(
            "Cached constructor shape for {} ({} parameters)",
            type_name,
            shape.parameters.len()
        );
        Ok(self
            .shapes
            .write()
            .entry(type_name.to_string())
            .or_insert(shape)
            .clone())
    }

    /// Whether the reflector can describe `type_name`
    pub fn knows(&self, type_name: &str) -> bool {
        self.shapes.read().contains_key(type_name) || self.reflector.describe(type_name).is_some()
    }

    pub fn is_cached(&self, type_name: &str) -> bool {
        self.shapes.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.read().is_empty()
    }

    pub fn clear(&self) {
        self.shapes.write().clear();
        debug!("Cleared reflection cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: TypeRegistry,
        lookups: AtomicUsize,
    }

    impl Reflector for Counting {
        fn describe(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.describe(type_name)
        }
    }

    struct Pair {
        a: i64,
        b: i64,
    }

    fn pair_descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Pair>("app::Pair")
            .param(ParamSpec::required("a"))
            .param(ParamSpec::with_default("b", 5))
            .construct(|args| {
                Ok(Pair {
                    a: args.i64(0)?,
                    b: args.i64(1)?,
                })
            })
    }

    #[test]
    fn test_shape_classification() {
        let shape = shape_of(&[
            ParamSpec::required("plain"),
            ParamSpec::with_default("retries", 3),
            ParamSpec::typed("logger", "app::Logger"),
            ParamSpec::typed("cache", "app::Cache").nullable(),
            ParamSpec {
                default: Some(Value::null()),
                ..ParamSpec::typed("typed_with_default", "app::Other")
            },
        ]);

        assert!(matches!(
            &shape[0].kind,
            ParameterKind::Dependency { target: None, nullable: false }
        ));
        assert!(matches!(&shape[1].kind, ParameterKind::Default(v) if v.as_i64() == Some(3)));
        assert!(matches!(
            &shape[2].kind,
            ParameterKind::Dependency { target: Some(t), nullable: false } if t == "app::Logger"
        ));
        assert!(matches!(
            &shape[3].kind,
            ParameterKind::Dependency { nullable: true, .. }
        ));
        assert!(matches!(&shape[4].kind, ParameterKind::Default(v) if v.is_null()));
        assert_eq!(shape[2].position, 2);
    }

    #[test]
    fn test_cache_introspects_once() {
        let registry = TypeRegistry::new();
        registry.register(pair_descriptor());
        let reflector = Arc::new(Counting {
            inner: registry,
            lookups: AtomicUsize::new(0),
        });
        let cache = ReflectionCache::new(reflector.clone());

        let first = cache.shape("app::Pair").unwrap();
        let second = cache.shape("app::Pair").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reflector.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(first.parameters.len(), 2);
        assert!(cache.is_cached("app::Pair"));
    }

    #[test]
    fn test_unknown_type_is_not_cached() {
        let cache = ReflectionCache::new(Arc::new(TypeRegistry::new()));

        assert!(matches!(
            cache.shape("app::Nope"),
            Err(DiError::UnknownType { name }) if name == "app::Nope"
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_non_configurable_type_rejects_properties() {
        let descriptor = pair_descriptor();
        let args = Args::new(Arc::from("app::Pair"), vec![Value::from(1), Value::from(2)]);

        let result = descriptor.instantiate(args.clone(), Properties::new().with("a", 3));
        assert!(matches!(result, Err(DiError::InvalidProperty { property, .. }) if property == "a"));

        let pair = descriptor.instantiate(args, Properties::new()).unwrap();
        let pair = pair.downcast::<Pair>().unwrap();
        assert_eq!((pair.a, pair.b), (1, 2));
    }

    #[test]
    fn test_type_without_parameters() {
        #[derive(Default)]
        struct Unit;

        let descriptor = TypeDescriptor::builder::<Unit>("app::Unit").construct_default();
        assert!(shape_of(descriptor.params()).is_empty());
        let obj = descriptor
            .instantiate(Args::new(Arc::from("app::Unit"), vec![]), Properties::new())
            .unwrap();
        assert_eq!(obj.type_name(), "app::Unit");
    }
}
