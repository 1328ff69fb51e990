//! Declarative configuration tests

#![cfg(feature = "config")]

mod common;

use common::*;
use keel_di::prelude::*;
use std::io::Write;

const APP_TOML: &str = r#"
[options]
max_depth = 16

[definitions."app::Transport"]
class = "app::Smtp"
singleton = true
params = ["mail.keel.dev", 587]

[definitions.settings]
class = "app::Settings"
properties = { x = 10, label = "from-toml", transport = { "$ref" = "app::Transport" } }

[components.mailer]
class = "app::Mailer"
"#;

#[test]
fn test_toml_configuration_end_to_end() {
    init_tracing();
    let config = ContainerConfig::from_toml(APP_TOML).unwrap();
    let locator = config.build_locator(types()).unwrap();
    let container = locator.container();

    assert_eq!(container.options().max_depth, 16);

    let settings = container.get("settings").unwrap();
    let settings = settings.downcast::<Settings>().unwrap();
    assert_eq!(settings.x, 10);
    assert_eq!(settings.label, "from-toml");

    let transport = container.get("app::Transport").unwrap();
    assert!(Object::ptr_eq(settings.transport.as_ref().unwrap(), &transport));

    let mailer = locator.get("mailer").unwrap();
    assert_eq!(
        mailer.downcast::<Mailer>().unwrap().transport.endpoint(),
        "mail.keel.dev:587"
    );
}

#[test]
fn test_json_configuration_applies_to_existing_container() {
    let config = ContainerConfig::from_json(
        r#"{
            "definitions": {
                "pair": {"class": "app::Pair", "params": [1]}
            }
        }"#,
    )
    .unwrap();
    let container = container();
    config.apply(&container).unwrap();

    let pair = container.get("pair").unwrap();
    let pair = pair.downcast::<Pair>().unwrap();
    assert_eq!((pair.a, pair.b), (1, 5));
}

#[test]
fn test_configuration_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(APP_TOML.as_bytes()).unwrap();

    let config = ContainerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.definitions.len(), 2);
    assert_eq!(config.components.len(), 1);
}

#[test]
fn test_component_without_class_is_a_parse_error() {
    let result = ContainerConfig::from_toml("[components.cache]\nproperties = { ttl = 5 }\n");
    assert!(matches!(result, Err(DiError::ConfigError(_))));
}
