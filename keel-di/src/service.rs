//! Service trait and the type-erased object handle produced by the container

use downcast_rs::{impl_downcast, DowncastSync};
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Trait that all services must implement
pub trait Service: DowncastSync {
    /// Get the type name of the service
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl_downcast!(sync Service);

/// Blanket implementation for all suitable types
impl<T: Any + Send + Sync> Service for T {}

type Caster = Arc<dyn Fn(Arc<dyn Service>) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Interfaces an object can be viewed through, with casters to `Arc<dyn Trait>`
#[derive(Clone, Default)]
pub struct Interfaces {
    names: Vec<String>,
    casters: FxHashMap<TypeId, Caster>,
}

impl Interfaces {
    /// Declare that `T` satisfies the interface `name`, viewable as `Arc<I>`
    pub fn add<T, I, F>(&mut self, name: &str, cast: F)
    where
        T: Service,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.add_name(name);
        let caster: Caster = Arc::new(move |value: Arc<dyn Service>| {
            value
                .downcast_arc::<T>()
                .ok()
                .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        self.casters.insert(TypeId::of::<Arc<I>>(), caster);
    }

    /// Declare an interface name without a trait view (type checks only)
    pub fn add_name(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    /// Declared interface names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn cast<I: ?Sized + Send + Sync + 'static>(&self, value: &Arc<dyn Service>) -> Option<Arc<I>> {
        let caster = self.casters.get(&TypeId::of::<Arc<I>>())?;
        let boxed = caster(value.clone())?;
        boxed.downcast::<Arc<I>>().ok().map(|arc| *arc)
    }
}

impl fmt::Debug for Interfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.names).finish()
    }
}

/// A built instance: shared value plus the type identity it was built under
#[derive(Clone)]
pub struct Object {
    type_name: Arc<str>,
    value: Arc<dyn Service>,
    interfaces: Arc<Interfaces>,
}

impl Object {
    /// Wrap a value, naming it after its Rust type
    pub fn new<T: Service>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value
    pub fn from_arc<T: Service>(value: Arc<T>) -> Self {
        Self {
            type_name: Arc::from(std::any::type_name::<T>()),
            value: value as Arc<dyn Service>,
            interfaces: Arc::new(Interfaces::default()),
        }
    }

    pub(crate) fn from_parts(
        type_name: Arc<str>,
        value: Arc<dyn Service>,
        interfaces: Arc<Interfaces>,
    ) -> Self {
        Self {
            type_name,
            value,
            interfaces,
        }
    }

    /// Override the type name used for `is_instance_of` checks and errors
    pub fn with_type_name(mut self, name: &str) -> Self {
        self.type_name = Arc::from(name);
        self
    }

    /// Declare an interface this object satisfies
    pub fn with_interface<T, I, F>(mut self, name: &str, cast: F) -> Self
    where
        T: Service,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.interfaces).add::<T, I, F>(name, cast);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn interfaces(&self) -> &[String] {
        self.interfaces.names()
    }

    /// True when `name` is the concrete type name or a declared interface
    pub fn is_instance_of(&self, name: &str) -> bool {
        &*self.type_name == name || self.interfaces.contains(name)
    }

    /// Check the concrete Rust type
    pub fn is<T: Service>(&self) -> bool {
        let value: &dyn Service = &*self.value;
        value.is::<T>()
    }

    /// Downcast to the concrete Rust type
    pub fn downcast<T: Service>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast_arc::<T>().ok()
    }

    /// View the object through a trait object declared with `with_interface`.
    ///
    /// Values that are themselves stored as `Arc<I>` are returned directly.
    pub fn cast<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        if let Some(view) = self.interfaces.cast::<I>(&self.value) {
            return Some(view);
        }
        let value: &dyn Service = &*self.value;
        value.downcast_ref::<Arc<I>>().cloned()
    }

    /// Identity comparison
    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&a.value), Arc::as_ptr(&b.value))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_downcast_and_identity() {
        let a = Object::new(42u32);
        let b = a.clone();

        assert!(a.is::<u32>());
        assert_eq!(*a.downcast::<u32>().unwrap(), 42);
        assert!(a.downcast::<String>().is_none());
        assert!(Object::ptr_eq(&a, &b));
        assert!(!Object::ptr_eq(&a, &Object::new(42u32)));
    }

    #[test]
    fn test_interface_cast() {
        let obj = Object::new(English)
            .with_type_name("app::English")
            .with_interface("app::Greeter", |e: Arc<English>| e as Arc<dyn Greeter>);

        assert!(obj.is_instance_of("app::English"));
        assert!(obj.is_instance_of("app::Greeter"));
        assert!(!obj.is_instance_of("app::Other"));
        assert_eq!(obj.cast::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_cast_of_stored_trait_object() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let obj = Object::new(greeter);

        assert_eq!(obj.cast::<dyn Greeter>().unwrap().greet(), "hello");
    }
}
