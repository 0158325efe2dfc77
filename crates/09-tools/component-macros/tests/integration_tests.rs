//! 派生宏集成测试

use component_macros::{Bean, Bindable};
use config_impl::{Binder, ConfigError, Properties};
use di_impl::{Container, DependencyResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Bindable)]
struct Pool {
    #[value("${max:=8}")]
    max: u32,
    #[value("${idle:=2}")]
    #[expr("$>=1")]
    idle: u32,
}

#[derive(Debug, Default, Bindable)]
struct Endpoint {
    #[value("${host}")]
    host: String,
    #[value("${port:=80}")]
    port: u16,
}

#[derive(Debug, Default, Bindable)]
struct DbConfig {
    #[value("${url}")]
    url: String,
    #[value("${pool}")]
    pool: Pool,
    #[embed]
    defaults: Pool,
    #[value("${replicas:=}")]
    replicas: Vec<Endpoint>,
    #[value("${labels:=}")]
    labels: HashMap<String, String>,
    untouched: Option<String>,
}

#[test]
fn test_derive_bindable() {
    let p = Properties::from_value(&json!({
        "db": {
            "url": "mysql://localhost",
            "max": 16,
            "pool": {"max": 32},
            "replicas": [{"host": "r1"}, {"host": "r2", "port": 3306}],
            "labels": {"zone": "a"}
        }
    }));

    let mut db = DbConfig::default();
    Binder::new(&p).bind(&mut db, "${db}").unwrap();

    assert_eq!(db.url, "mysql://localhost");
    assert_eq!(db.pool.max, 32);
    assert_eq!(db.pool.idle, 2);
    assert_eq!(db.defaults.max, 16);
    assert_eq!(db.replicas.len(), 2);
    assert_eq!(db.replicas[0].port, 80);
    assert_eq!(db.replicas[1].port, 3306);
    assert_eq!(db.labels["zone"], "a");
    assert!(db.untouched.is_none());
}

#[test]
fn test_derive_bindable_errors() {
    let p = Properties::from_value(&json!({"db": {"pool": {"idle": 0}}}));
    let binder = Binder::new(&p);

    let mut db = DbConfig::default();
    let err = binder.bind(&mut db, "${db}").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ConfigError::PropertyNotConfig { .. }
    ));

    let mut pool = Pool::default();
    let err = binder.bind(&mut pool, "${db.pool}").unwrap_err();
    assert!(err.to_string().contains("Pool.idle"), "{err}");
    assert!(matches!(
        err.root_cause(),
        ConfigError::ValidationFailed { .. }
    ));

    let err = binder.bind(&mut pool, "${db.pool:=x}").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ConfigError::DefaultNotAllowed { kind: "struct" }
    ));
}

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

#[derive(Default, Bean)]
struct Audit;

impl Plugin for Audit {
    fn name(&self) -> &str {
        "audit"
    }
}

#[derive(Default, Bean)]
struct Metrics {
    #[value("${metrics.prefix:=app}")]
    prefix: String,
}

#[derive(Default, Bean)]
struct Repository {
    #[value("${db}")]
    config: DbConfig,
}

#[derive(Default, Bean)]
struct Handlers {
    #[inject("[]")]
    plugins: Vec<Arc<dyn Plugin>>,
}

#[derive(Default, Bean)]
struct Service {
    #[value("${server.port:=8080}")]
    #[expr("$>0")]
    port: u16,
    #[autowire]
    repository: Option<Arc<Repository>>,
    #[autowire("Metrics:?")]
    metrics: Option<Arc<Metrics>>,
    #[nested]
    handlers: Handlers,
    plain: u8,
}

#[test]
fn test_derive_bean() -> DependencyResult<()> {
    let mut container = Container::new();
    container.set_property("db", json!({"url": "pg://db"}));
    container.register_bean(Service::default())?;
    container.register_bean(Repository::default())?;
    container
        .register_bean(Audit)?
        .export(|a| a as Arc<dyn Plugin>)?;
    container.auto_wire_beans()?;

    let service = container.get_bean::<Service>("")?;
    assert_eq!(service.port, 8080);
    assert_eq!(service.plain, 0);
    assert!(service.metrics.is_none());
    let repository = service.repository.as_ref().expect("repository injected");
    assert_eq!(repository.config.url, "pg://db");
    assert_eq!(repository.config.pool.max, 8);
    let names: Vec<&str> = service.handlers.plugins.iter().map(|p| p.name()).collect();
    assert_eq!(names, ["audit"]);
    Ok(())
}

#[test]
fn test_derive_bean_error_path() {
    let mut container = Container::new();
    container.set_property("server.port", 0);
    container.register_bean(Service::default()).unwrap();

    let err = container.auto_wire_beans().unwrap_err();
    assert!(err.to_string().contains("Service.port"), "{err}");
}

#[test]
fn test_optional_metrics() -> DependencyResult<()> {
    let mut container = Container::new();
    container.set_property("db.url", "pg://db");
    container.set_property("metrics.prefix", "svc");
    container.register_bean(Service::default())?;
    container.register_bean(Repository::default())?;
    container.register_bean(Metrics::default())?;
    container.register_bean(Audit)?.export(|a| a as Arc<dyn Plugin>)?;
    container.auto_wire_beans()?;

    let service = container.get_bean::<Service>("")?;
    let metrics = service.metrics.as_ref().expect("metrics injected");
    assert_eq!(metrics.prefix, "svc");
    Ok(())
}
