//! # Component Macros
//!
//! 这个 crate 提供了用于属性绑定和 bean 装配的派生宏。
//!
//! ## 核心宏
//!
//! - [`Bindable`](derive@Bindable) - 为结构体实现 `config_impl::Bindable`
//! - [`Bean`](derive@Bean) - 为结构体实现 `di_impl::Wirable`
//!
//! ## 使用示例
//!
//! ```ignore
//! use component_macros::{Bean, Bindable};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Bindable)]
//! pub struct DbConfig {
//!     #[value("${url}")]
//!     url: String,
//!     #[value("${pool.size:=4}")]
//!     #[expr("$>0")]
//!     pool_size: u32,
//! }
//!
//! #[derive(Default, Bean)]
//! pub struct Repository {
//!     #[value("${db}")]
//!     config: DbConfig,
//!     #[autowire("?")]
//!     cache: Option<Arc<dyn Cache>>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod bean;
mod bindable;
mod utils;

/// 属性绑定派生宏
///
/// # 字段属性
///
/// - `#[value("${key:=default}")]` - 绑定标签，键相对于父级前缀
/// - `#[expr("$>=1")]` - 绑定后的校验表达式
/// - `#[embed]` - 沿用父级前缀绑定内嵌结构体
///
/// 没有属性的字段不参与绑定。
#[proc_macro_derive(Bindable, attributes(value, expr, embed))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bindable::derive_bindable_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// bean 派生宏
///
/// # 字段属性
///
/// - `#[value("${key}")]` / `#[expr("...")]` - 绑定属性，键为全局键
/// - `#[autowire("selector")]` / `#[inject("selector")]` - 注入 bean，
///   目标为 `Option<Arc<T>>` 或 `Vec<Arc<T>>`；省略选择器时按类型查找
/// - `#[nested]` - 装配同样派生了 `Bean` 的内嵌结构体
///
/// # 示例
///
/// ```ignore
/// #[derive(Default, Bean)]
/// pub struct Controller {
///     #[value("${server.port:=8080}")]
///     port: u16,
///     #[inject("[]")]
///     filters: Vec<Arc<dyn Filter>>,
/// }
/// ```
#[proc_macro_derive(Bean, attributes(value, expr, autowire, inject, nested))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bean::derive_bean_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
