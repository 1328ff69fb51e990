//! Shared test services and their descriptors

#![allow(dead_code)]

use keel_di::prelude::*;
use std::sync::Arc;

pub trait Transport: Send + Sync {
    fn endpoint(&self) -> String;
}

pub struct Smtp {
    pub host: String,
    pub port: i64,
}

impl Transport for Smtp {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct Mailer {
    pub transport: Arc<dyn Transport>,
    pub from: String,
}

pub struct Pair {
    pub a: i64,
    pub b: i64,
}

#[derive(Default)]
pub struct Settings {
    pub x: i64,
    pub label: String,
    pub transport: Option<Object>,
    pub initialized: bool,
}

impl Configurable for Settings {
    fn set_property(&mut self, name: &str, value: Value) -> DiResult<()> {
        match name {
            "x" => self.x = value.as_i64().unwrap_or_default(),
            "label" => self.label = value.as_str().unwrap_or_default().to_string(),
            "transport" => self.transport = value.as_object().cloned(),
            other => return Err(DiError::unknown_property("app::Settings", other)),
        }
        Ok(())
    }

    fn init(&mut self) -> DiResult<()> {
        self.initialized = true;
        Ok(())
    }
}

pub struct Logger {
    pub name: String,
}

pub struct Audit {
    pub logger: Option<Arc<Logger>>,
}

pub struct Left;
pub struct Right;

pub fn types() -> TypeRegistry {
    let types = TypeRegistry::new();
    types
        .register(
            TypeDescriptor::builder::<Smtp>("app::Smtp")
                .param(ParamSpec::with_default("host", "localhost"))
                .param(ParamSpec::with_default("port", 25))
                .implements("app::Transport", |smtp: Arc<Smtp>| smtp as Arc<dyn Transport>)
                .construct(|args| {
                    Ok(Smtp {
                        host: args.string(0)?,
                        port: args.i64(1)?,
                    })
                }),
        )
        .register(
            TypeDescriptor::builder::<Mailer>("app::Mailer")
                .param(ParamSpec::typed("transport", "app::Transport"))
                .param(ParamSpec::with_default("from", "noreply@keel.dev"))
                .construct(|args| {
                    Ok(Mailer {
                        transport: args.interface::<dyn Transport>(0)?,
                        from: args.string(1)?,
                    })
                }),
        )
        .register(
            TypeDescriptor::builder::<Pair>("app::Pair")
                .param(ParamSpec::required("a"))
                .param(ParamSpec::with_default("b", 5))
                .construct(|args| {
                    Ok(Pair {
                        a: args.i64(0)?,
                        b: args.i64(1)?,
                    })
                }),
        )
        .register(
            TypeDescriptor::builder::<Settings>("app::Settings")
                .configurable()
                .construct_default(),
        )
        .register(
            TypeDescriptor::builder::<Audit>("app::Audit")
                .param(ParamSpec::typed("logger", "app::Logger").nullable())
                .construct(|args| {
                    Ok(Audit {
                        logger: args.optional::<Logger>(0)?,
                    })
                }),
        )
        .register(
            TypeDescriptor::builder::<Left>("app::Left")
                .param(ParamSpec::typed("right", "app::Right"))
                .construct(|_| Ok(Left)),
        )
        .register(
            TypeDescriptor::builder::<Right>("app::Right")
                .param(ParamSpec::typed("left", "app::Left"))
                .construct(|_| Ok(Right)),
        );
    types
}

pub fn logger_descriptor() -> TypeDescriptor {
    TypeDescriptor::builder::<Logger>("app::Logger")
        .param(ParamSpec::with_default("name", "app"))
        .construct(|args| Ok(Logger { name: args.string(0)? }))
}

pub fn container() -> Container {
    Container::with_types(types())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
