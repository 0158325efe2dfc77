//! # Dependency Injection Abstractions
//!
//! 依赖注入的抽象层，定义 bean 选择器、状态、注册条件等核心概念。
//!
//! ## 核心概念
//!
//! - [`BeanSelector`] - `TypeName:beanName` 形式的 bean 选择器
//! - [`BeanStatus`] / [`BeanKind`] - bean 定义的状态机与种类
//! - [`Condition`] / [`Conditional`] - 注册条件及其串联求值
//! - [`ConditionContext`] - 条件求值时可访问的属性与 bean

pub mod conditional;
pub mod definition;
pub mod selector;

pub use conditional::*;
pub use definition::*;
pub use selector::*;
