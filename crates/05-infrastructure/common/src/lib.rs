//! # Infrastructure Common
//!
//! 这个 crate 提供了配置绑定和依赖注入两层共用的基础设施。
//!
//! ## 核心组件
//!
//! - [`ConfigError`] / [`DependencyError`] - 错误类型
//! - [`cast`] - 严格/宽松两级类型转换
//! - [`expression`] - 受限的比较表达式求值
//! - [`TypeInfo`] - 类型元数据

pub mod cast;
pub mod errors;
pub mod expression;
pub mod metadata;

pub use errors::*;
pub use metadata::*;
