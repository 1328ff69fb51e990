//! Post-construction configuration and lifecycle hooks

use crate::error::DiResult;
use crate::value::Value;

/// Types that accept named property assignments after construction.
///
/// The container calls `set_property` once per configured property, in
/// definition order, then `init` exactly once. Types that never receive
/// properties still get `init` when they are registered as configurable.
pub trait Configurable {
    /// Assign a single property
    fn set_property(&mut self, name: &str, value: Value) -> DiResult<()>;

    /// Called after all properties have been applied
    fn init(&mut self) -> DiResult<()> {
        Ok(())
    }
}

/// Apply `properties` to `target` and finish with `init`
pub(crate) fn configure<T: Configurable>(
    target: &mut T,
    properties: impl IntoIterator<Item = (String, Value)>,
) -> DiResult<()> {
    for (name, value) in properties {
        target.set_property(&name, value)?;
    }
    target.init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;

    #[derive(Default)]
    struct Mailer {
        host: String,
        port: i64,
        ready: bool,
    }

    impl Configurable for Mailer {
        fn set_property(&mut self, name: &str, value: Value) -> DiResult<()> {
            match name {
                "host" => self.host = value.as_str().unwrap_or_default().to_string(),
                "port" => self.port = value.as_i64().unwrap_or_default(),
                _ => return Err(DiError::unknown_property("Mailer", name)),
            }
            Ok(())
        }

        fn init(&mut self) -> DiResult<()> {
            self.ready = !self.host.is_empty();
            Ok(())
        }
    }

    #[test]
    fn test_configure_applies_then_inits() {
        let mut mailer = Mailer::default();
        configure(
            &mut mailer,
            vec![
                ("host".to_string(), Value::from("smtp.local")),
                ("port".to_string(), Value::from(25)),
            ],
        )
        .unwrap();

        assert_eq!(mailer.host, "smtp.local");
        assert_eq!(mailer.port, 25);
        assert!(mailer.ready);
    }

    #[test]
    fn test_configure_stops_on_unknown_property() {
        let mut mailer = Mailer::default();
        let result = configure(&mut mailer, vec![("bogus".to_string(), Value::null())]);

        assert!(matches!(result, Err(DiError::InvalidProperty { .. })));
        assert!(!mailer.ready);
    }
}
