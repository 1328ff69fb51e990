//! Error types for the DI container

use thiserror::Error;

/// Result type alias for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while registering or resolving definitions
#[derive(Error, Debug)]
pub enum DiError {
    /// The reflection facility has no descriptor for this name
    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    /// A definition is malformed or has an unsupported shape
    #[error("Invalid definition for \"{name}\": {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// A constructor parameter received no value, default, or dependency
    #[error("Missing required parameter \"{parameter}\" when instantiating \"{type_name}\"")]
    MissingRequiredParameter { parameter: String, type_name: String },

    /// A type-hinted parameter's target could not be resolved
    #[error("Cannot resolve dependency \"{target}\" for parameter \"{parameter}\" of \"{type_name}\"")]
    UnresolvableDependency {
        parameter: String,
        type_name: String,
        target: String,
        #[source]
        source: Box<DiError>,
    },

    /// A resolved object does not satisfy the expected type
    #[error("\"{reference}\" refers to a {actual} component, {expected} is expected")]
    TypeMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    /// Resolution revisited a name that is still being built
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Resolution went deeper than the configured bound
    #[error("Resolution depth of {depth} exceeded while resolving \"{name}\"")]
    ResolutionDepthExceeded { name: String, depth: usize },

    /// Service locator lookup for an id that was never set
    #[error("Unknown component ID: {id}")]
    UnknownComponent { id: String },

    /// A constructor argument has the wrong shape
    #[error("Invalid argument {position} for \"{type_name}\": expected {expected}, found {found}")]
    InvalidArgument {
        type_name: String,
        position: usize,
        expected: &'static str,
        found: String,
    },

    /// A configured property was rejected by the target object
    #[error("Cannot set property \"{property}\" on \"{type_name}\": {reason}")]
    InvalidProperty {
        type_name: String,
        property: String,
        reason: String,
    },

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error raised by user factories
    #[error("DI error: {0}")]
    Other(String),
}

impl DiError {
    pub(crate) fn invalid_definition(name: &str, reason: impl Into<String>) -> Self {
        DiError::InvalidDefinition {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for rejecting a property name a type does not know
    pub fn unknown_property(type_name: &str, property: &str) -> Self {
        DiError::InvalidProperty {
            type_name: type_name.to_string(),
            property: property.to_string(),
            reason: "unknown property".to_string(),
        }
    }

    /// Follow `UnresolvableDependency` wrappers down to the innermost failure
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let DiError::UnresolvableDependency { source, .. } = current {
            current = source;
        }
        current
    }
}
