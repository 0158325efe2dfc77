//! # Configuration Implementation
//!
//! 属性存储与类型化绑定的具体实现。
//!
//! ## 主要组件
//!
//! - [`Properties`] - 扁平化的属性存储，支持 `${...}` 引用解析
//! - [`ReaderRegistry`] - 按扩展名选择的配置文件读取器
//! - [`ConverterRegistry`] - 字符串到自定义类型的转换器及拆分器
//! - [`Binder`] / [`Bindable`] - 把属性树绑定到 Rust 值

pub mod binder;
pub mod converter;
pub mod properties;
pub mod readers;

pub use binder::*;
pub use converter::*;
pub use properties::*;
pub use readers::*;

pub use config_abstractions::{BindFilter, BindParam, BindTag, PropertyReader, PropertySource};
pub use infrastructure_common::{ConfigError, ConfigResult};
