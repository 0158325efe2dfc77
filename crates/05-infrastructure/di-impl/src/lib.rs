//! # 依赖注入具体实现
//!
//! 提供 bean 容器、注册构建器、装配引擎和构造函数参数注入。
//!
//! ```ignore
//! let mut container = Container::new();
//! container.set_property("server.port", 8080);
//! container.register_bean(Server::default())?;
//! container.register_bean_fn(Registry::new, &["${registry}"])?;
//! container.auto_wire_beans()?;
//!
//! let server = container.get_bean::<Server>("")?;
//! ```

pub mod args;
pub mod container;
pub mod definition;
pub mod registration;
pub mod wiring;

pub use args::{ArgValue, Constructor, Prop};
pub use container::{Container, ACTIVE_PROFILES_PROPERTY};
pub use definition::BeanDefinition;
pub use registration::Registration;
pub use wiring::{Injectable, WireContext, Wirable};

pub use di_abstractions::{BeanInfo, BeanKind, BeanSelector, BeanStatus, ConditionContext};
pub use infrastructure_common::{DependencyError, DependencyResult};
