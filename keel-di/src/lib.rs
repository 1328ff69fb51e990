//! Name-keyed dependency injection for Keel
//!
//! This crate provides a runtime container that builds objects from
//! registered definitions, autowires constructor dependencies from type
//! hints, memoizes singletons, and a service locator that realizes named
//! components lazily.
//!
//! Types are made known to the container through [`TypeDescriptor`]s, which
//! describe constructor parameters, declared interfaces, and how to build
//! the value:
//!
//! ```
//! use keel_di::prelude::*;
//!
//! struct Logger;
//! struct Mailer {
//!     host: String,
//!     logger: std::sync::Arc<Logger>,
//! }
//!
//! let types = TypeRegistry::new();
//! types
//!     .register(TypeDescriptor::builder::<Logger>("app::Logger").construct(|_| Ok(Logger)))
//!     .register(
//!         TypeDescriptor::builder::<Mailer>("app::Mailer")
//!             .param(ParamSpec::with_default("host", "localhost"))
//!             .param(ParamSpec::typed("logger", "app::Logger"))
//!             .construct(|args| {
//!                 Ok(Mailer {
//!                     host: args.string(0)?,
//!                     logger: args.get::<Logger>(1)?,
//!                 })
//!             }),
//!     );
//!
//! let container = Container::with_types(types);
//! container.register_singleton("app::Logger", Definition::Empty)?;
//!
//! let mailer = container.get("app::Mailer")?;
//! assert_eq!(mailer.downcast::<Mailer>().unwrap().host, "localhost");
//! # Ok::<(), DiError>(())
//! ```

pub mod builder;
pub mod configurable;
pub mod container;
pub mod definition;
pub mod error;
pub mod instance;
pub mod locator;
pub mod reflection;
pub mod service;
pub mod value;

mod macros;

#[cfg(feature = "config")]
pub mod config;

pub use builder::{ContainerBuilder, Module};
pub use configurable::Configurable;
pub use container::{Container, ContainerOptions};
pub use definition::{ConfigRecord, Definition, Factory, Recipe};
pub use error::{DiError, DiResult};
pub use instance::Instance;
pub use locator::ServiceLocator;
pub use reflection::{
    ConstructorParameter, ParamSpec, ParameterKind, ReflectionCache, Reflector, TypeBuilder,
    TypeDescriptor, TypeRegistry, TypeShape,
};
pub use service::{Interfaces, Object, Service};
pub use value::{Args, Params, Properties, Value};

#[cfg(feature = "config")]
pub use config::ContainerConfig;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        params, properties, Args, ConfigRecord, Configurable, Container, ContainerBuilder,
        Definition, DiError, DiResult, Instance, Module, Object, ParamSpec, Params, Properties,
        Service, ServiceLocator, TypeDescriptor, TypeRegistry, Value,
    };

    #[cfg(feature = "config")]
    pub use crate::ContainerConfig;
}
