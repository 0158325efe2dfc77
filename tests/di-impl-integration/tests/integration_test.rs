//! Centralized integration tests for di-impl crate

use component_macros::{Bean, Bindable};
use config_impl::{Binder, ConfigError, Properties};
use di_abstractions::ConditionContext;
use di_impl::{Container, DependencyError, DependencyResult, Prop};
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[derive(Debug, Default, Bindable)]
struct Limits {
    #[value("${uint:=2}")]
    #[expr("$>=3")]
    uint: u32,
}

#[test]
fn test_validate_scenario() {
    let p = Properties::from_value(&json!({"s": {"uint": "1"}}));
    let mut limits = Limits::default();
    let err = Binder::new(&p).bind(&mut limits, "${s}").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("validate failed"), "{message}");
    assert!(message.contains("for value 1"), "{message}");

    let p = Properties::from_value(&json!({"s": {"uint": "3"}}));
    Binder::new(&p).bind(&mut limits, "${s}").unwrap();
    assert_eq!(limits.uint, 3);
}

#[test]
fn test_default_precedence() {
    let mut p = Properties::new();
    let mut value = 0u32;
    p.bind(&mut value, "${uint:=3}").unwrap();
    assert_eq!(value, 3);

    p.set("uint", 5);
    p.bind(&mut value, "${uint:=3}").unwrap();
    assert_eq!(value, 5);
}

#[test]
fn test_map_parse_error() {
    let p = Properties::from_value(&json!({"map": {"a": "1", "b": "abc"}}));
    let mut m: HashMap<String, u32> = HashMap::new();
    let err = p.bind(&mut m, "${map}").unwrap_err();
    assert!(err.to_string().contains("abc"), "{err}");
    assert!(matches!(err.root_cause(), ConfigError::Cast(_)));
}

trait Storage: Send + Sync {
    fn kind(&self) -> &'static str;
}

#[derive(Default, Bean)]
struct DiskStorage;

impl Storage for DiskStorage {
    fn kind(&self) -> &'static str {
        "disk"
    }
}

#[derive(Default, Bean)]
struct MemoryStorage;

impl Storage for MemoryStorage {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default, Bean)]
struct Archive {
    #[autowire]
    storage: Option<Arc<dyn Storage>>,
}

#[test]
fn test_two_implementations_without_primary() {
    let mut container = Container::new();
    container.register_bean(Archive::default()).unwrap();
    container
        .register_bean(DiskStorage)
        .unwrap()
        .export(|s| s as Arc<dyn Storage>)
        .unwrap();
    container
        .register_bean(MemoryStorage)
        .unwrap()
        .export(|s| s as Arc<dyn Storage>)
        .unwrap();

    let err = container.auto_wire_beans().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("found 2 beans"), "{message}");
    assert!(message.contains("DiskStorage@"), "{message}");
    assert!(message.contains("MemoryStorage@"), "{message}");
}

#[derive(Debug, Default, Clone, PartialEq, Bindable)]
struct Address {
    #[value("${host}")]
    host: String,
    #[value("${port}")]
    port: u16,
}

fn parse_address(text: &str) -> Result<Address, String> {
    let (host, port) = text
        .rsplit_once(':')
        .ok_or_else(|| format!("missing port in {text}"))?;
    Ok(Address {
        host: host.to_string(),
        port: port.parse().map_err(|e| format!("{e}"))?,
    })
}

#[derive(Debug, Default, Bindable)]
struct AppConfig {
    #[value("${name}")]
    name: String,
    #[value("${timeout:=5s}")]
    timeout: Duration,
    #[value("${upstreams:=}")]
    upstreams: Vec<Address>,
    #[value("${tags:=}||lines")]
    tags: Vec<String>,
}

#[derive(Default, Bean)]
struct Gateway {
    #[value("${app}")]
    config: AppConfig,
    #[inject("[]?")]
    storages: Vec<Arc<dyn Storage>>,
}

#[test]
fn test_yaml_file_and_converters() -> DependencyResult<()> {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "app.yaml",
        r#"
app:
  name: gateway
  timeout: 1m30s
  upstreams:
    - "10.0.0.1:80"
    - "10.0.0.2:8080"
  tags: "a\nb"
"#,
    );

    let mut container = Container::new();
    container.load_properties(&path)?;
    container.converters_mut().register(parse_address);
    container
        .converters_mut()
        .register_splitter("lines", |s: &str| Ok(s.lines().map(str::to_string).collect()));
    container.register_bean(Gateway::default())?;
    container.register_bean(DiskStorage)?.export(|s| s as Arc<dyn Storage>)?;
    container.auto_wire_beans()?;

    let gateway = container.get_bean::<Gateway>("")?;
    assert_eq!(gateway.config.name, "gateway");
    assert_eq!(gateway.config.timeout, Duration::from_secs(90));
    assert_eq!(
        gateway.config.upstreams,
        [
            Address { host: "10.0.0.1".into(), port: 80 },
            Address { host: "10.0.0.2".into(), port: 8080 },
        ]
    );
    assert_eq!(gateway.config.tags, ["a", "b"]);
    assert_eq!(gateway.storages.len(), 1);
    Ok(())
}

#[test]
fn test_toml_and_properties_files() -> DependencyResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let toml = write_file(&dir, "base.toml", "[app]\nname = \"base\"\ntimeout = \"2s\"\n");
    let props = write_file(&dir, "override.properties", "# override\napp.name=override\n");

    let mut container = Container::new();
    container.load_properties(&toml)?;
    container.load_properties(&props)?;

    let mut config = AppConfig::default();
    container.binder().bind(&mut config, "${app}")?;
    assert_eq!(config.name, "override");
    assert_eq!(config.timeout, Duration::from_secs(2));

    let err = container.load_properties(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(
        err,
        DependencyError::Config(ConfigError::FileNotFound { .. })
    ));
    Ok(())
}

#[derive(Default, Bean)]
struct Cache {
    #[value("${cache.size:=128}")]
    size: usize,
}

#[test]
fn test_conditions_and_profiles() -> DependencyResult<()> {
    let mut container = Container::new();
    container.set_property("spring.profiles.active", "prod");
    container.set_property("storage.kind", "memory");
    container.set_property("cache.size", 512);

    container
        .register_bean(DiskStorage)?
        .export(|s| s as Arc<dyn Storage>)?
        .on_property_value("storage.kind", "disk")?;
    container
        .register_bean(MemoryStorage)?
        .export(|s| s as Arc<dyn Storage>)?
        .on_property_value("storage.kind", "memory")?;
    container.register_bean(Archive::default())?;
    container
        .register_bean(Cache::default())?
        .profile("prod")
        .on_property_value("cache.size", "$>=256")?
        .and()
        .on_match(|ctx: &mut dyn ConditionContext| {
            Ok(!ctx.find_bean(&"Archive:".parse()?)?.is_empty())
        })?;
    container.auto_wire_beans()?;

    let archive = container.get_bean::<Archive>("")?;
    let storage = archive.storage.as_ref().expect("storage injected");
    assert_eq!(storage.kind(), "memory");
    assert!(container.find_bean("DiskStorage")?.is_empty());
    assert_eq!(container.get_bean::<Cache>("")?.size, 512);
    Ok(())
}

#[test]
fn test_unsupported_expression_condition() {
    let mut container = Container::new();
    container
        .register_bean(Cache::default())
        .unwrap()
        .on_expression("1 + 1 == 2")
        .unwrap();
    let err = container.auto_wire_beans().unwrap_err();
    assert!(matches!(err, DependencyError::Unsupported { .. }));
}

struct Pool {
    size: usize,
    storage: Arc<dyn Storage>,
}

impl di_impl::Wirable for Pool {}

struct Session {
    owner: String,
    pool_size: usize,
}

impl di_impl::Wirable for Session {}

#[derive(Debug, thiserror::Error)]
#[error("pool size must be positive")]
struct PoolError;

#[test]
fn test_function_beans() -> DependencyResult<()> {
    let mut container = Container::new();
    container.set_property("pool.size", 4);
    container.set_property("owners", json!(["alice", "bob"]));
    container.register_bean(DiskStorage)?.export(|s| s as Arc<dyn Storage>)?;
    container.register_bean_try_fn(
        |size: usize, storage: Arc<dyn Storage>| -> Result<Pool, PoolError> {
            if size == 0 {
                return Err(PoolError);
            }
            Ok(Pool { size, storage })
        },
        &["${pool.size}"],
    )?;
    container.register_method_bean(
        "Pool:",
        |pool: Arc<Pool>, owners: Prop<Vec<String>>| Session {
            owner: owners.join(","),
            pool_size: pool.size,
        },
        &["${owners}"],
    )?;
    container.auto_wire_beans()?;

    let session = container.get_bean::<Session>("")?;
    assert_eq!(session.owner, "alice,bob");
    assert_eq!(session.pool_size, 4);
    assert_eq!(container.get_bean::<Pool>("")?.storage.kind(), "disk");
    Ok(())
}

#[test]
fn test_function_bean_error() {
    let mut container = Container::new();
    container.set_property("pool.size", 0);
    container
        .register_bean(DiskStorage)
        .unwrap()
        .export(|s| s as Arc<dyn Storage>)
        .unwrap();
    container
        .register_bean_try_fn(
            |size: usize, storage: Arc<dyn Storage>| -> Result<Pool, PoolError> {
                if size == 0 {
                    return Err(PoolError);
                }
                Ok(Pool { size, storage })
            },
            &["${pool.size}"],
        )
        .unwrap();

    let err = container.auto_wire_beans().unwrap_err();
    assert!(matches!(err, DependencyError::ConstructorFailed { .. }));
    assert!(err.to_string().contains("pool size must be positive"), "{err}");
}

#[test]
fn test_function_bean_anyhow_error() {
    let mut container = Container::new();
    container.set_property("owners", "");
    container
        .register_bean_try_fn(
            |owners: Prop<Vec<String>>| -> anyhow::Result<Session> {
                anyhow::ensure!(!owners.is_empty(), "session needs at least one owner");
                Ok(Session {
                    owner: owners.join(","),
                    pool_size: 0,
                })
            },
            &["${owners}"],
        )
        .unwrap();

    let err = container.auto_wire_beans().unwrap_err();
    assert!(matches!(err, DependencyError::ConstructorFailed { .. }));
    assert!(err.to_string().contains("session needs at least one owner"), "{err}");
}

#[derive(Default, Bean)]
struct Node {
    #[autowire("Peer:")]
    peer: Option<Arc<Peer>>,
}

#[derive(Default, Bean)]
struct Peer {
    #[autowire("Node:")]
    node: Option<Arc<Node>>,
}

#[test]
fn test_cycle_reports_path() {
    let mut container = Container::new();
    container.register_bean(Peer::default()).unwrap();
    container.register_bean(Node::default()).unwrap();

    let err = container.auto_wire_beans().unwrap_err();
    match err.root_cause() {
        DependencyError::CircularDependency { path } => {
            let beans: Vec<&str> = path
                .split(" -> ")
                .map(|d| d.split('@').next().unwrap_or(d))
                .collect();
            assert_eq!(beans, ["Peer", "Node", "Peer"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_collect_after_freeze() -> DependencyResult<()> {
    let mut container = Container::new();
    container.register_bean(DiskStorage)?.export(|s| s as Arc<dyn Storage>)?;
    container
        .register_name_bean("memory", MemoryStorage)?
        .export(|s| s as Arc<dyn Storage>)?
        .primary();
    container.auto_wire_beans()?;

    let kinds: Vec<&str> = container
        .collect_beans::<dyn Storage>()?
        .iter()
        .map(|s| s.kind())
        .collect();
    assert_eq!(kinds, ["disk", "memory"]);
    assert_eq!(container.get_bean::<dyn Storage>("")?.kind(), "memory");

    let infos = container.find_bean("memory")?;
    assert_eq!(infos.len(), 1);
    assert!(infos[0].primary);
    assert!(infos[0].any_type(|t| t.short_name() == "dyn Storage"));
    Ok(())
}
