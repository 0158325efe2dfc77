//! # Configuration Abstractions
//!
//! 配置绑定抽象层，定义属性存储与绑定器之间的接口和约定。
//!
//! ## 核心接口
//!
//! - [`PropertyReader`] - 配置文件读取器接口
//! - [`PropertySource`] - 只读属性视图
//! - [`BindFilter`] - 绑定过滤器接口
//! - [`BindTag`] / [`BindParam`] - 绑定标签及参数

pub mod filter;
pub mod provider;
pub mod tag;

pub use filter::*;
pub use provider::*;
pub use tag::*;
