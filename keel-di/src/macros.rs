//! Shorthand for building call-site params and property sets

/// Build [`Params`](crate::Params), either in order or by explicit position.
///
/// ```
/// use keel_di::{params, Instance};
///
/// let ordered = params!["smtp.local", 25];
/// assert_eq!(ordered.len(), 2);
///
/// let sparse = params![1 => Instance::of("app::Logger")];
/// assert!(sparse.get(0).is_none());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($position:literal => $value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(
            params.insert($position, $value);
        )+
        params
    }};
    ($($value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(
            params.insert(params.span(), $value);
        )+
        params
    }};
}

/// Build [`Properties`](crate::Properties) in the given order.
///
/// ```
/// use keel_di::properties;
///
/// let config = properties! { "host" => "smtp.local", "port" => 25 };
/// assert_eq!(config.get("port").and_then(|v| v.as_i64()), Some(25));
/// ```
#[macro_export]
macro_rules! properties {
    () => {
        $crate::Properties::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut properties = $crate::Properties::new();
        $(
            properties.set($name, $value);
        )+
        properties
    }};
}
