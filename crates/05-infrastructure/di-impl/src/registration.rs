//! bean 注册构建器

use crate::container::Container;
use crate::definition::{AnyArc, BeanDefinition, Caster};
use di_abstractions::{BeanSelector, Conditional, ConditionContext};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// 注册构建器，用于补充刚注册的 bean 定义
///
/// ```ignore
/// container
///     .register_bean(RedisCache::default())?
///     .export(|c| c as Arc<dyn Cache>)?
///     .on_property("cache.redis.url")?
///     .primary();
/// ```
pub struct Registration<'a, T> {
    container: &'a mut Container,
    id: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> Registration<'a, T> {
    pub(crate) fn new(container: &'a mut Container, id: usize) -> Self {
        Self {
            container,
            id,
            _marker: PhantomData,
        }
    }

    fn def(&mut self) -> &mut BeanDefinition {
        &mut self.container.defs[self.id]
    }

    /// 只读描述
    pub fn info(&self) -> di_abstractions::BeanInfo {
        self.container.defs[self.id].info()
    }

    /// 设为首选 bean
    pub fn primary(mut self) -> Self {
        self.def().primary = true;
        self
    }

    /// 仅在给定 profile 激活时保留
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.def().profile = Some(profile.into());
        self
    }

    /// 装配前先装配选择器指定的 bean
    pub fn depends_on(mut self, selector: &str) -> DependencyResult<Self> {
        let selector = BeanSelector::parse(selector)?;
        self.def().depends_on.push(selector);
        Ok(self)
    }

    /// 导出为另一种类型，通常是 trait 对象
    pub fn export<I, F>(mut self, cast: F) -> DependencyResult<Self>
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let info = TypeInfo::of::<I>();
        let def = self.def();
        if def.provides(info.id) {
            return Err(DependencyError::Unsupported {
                message: format!("{} already exports {}", def.description(), info.short_name()),
            });
        }
        let caster: Caster = Arc::new(move |instance: AnyArc| {
            instance
                .downcast::<T>()
                .ok()
                .map(|bean| Box::new(cast(bean)) as Box<dyn Any>)
        });
        def.casters.push((info, caster));

        let id = self.id;
        self.container.type_index.entry(info.id).or_default().push(id);
        Ok(self)
    }

    fn conditional(&mut self) -> &mut Conditional {
        &mut self.def().conditional
    }

    /// 属性存在时保留
    pub fn on_property(mut self, name: &str) -> DependencyResult<Self> {
        self.conditional().on_property(name)?;
        Ok(self)
    }

    /// 属性不存在时保留
    pub fn on_missing_property(mut self, name: &str) -> DependencyResult<Self> {
        self.conditional().on_missing_property(name)?;
        Ok(self)
    }

    /// 属性值满足条件时保留，`having_value` 含 `$` 时按表达式求值
    pub fn on_property_value(mut self, name: &str, having_value: &str) -> DependencyResult<Self> {
        self.conditional().on_property_value(name, having_value)?;
        Ok(self)
    }

    /// 存在匹配的 bean 时保留
    pub fn on_bean(mut self, selector: &str) -> DependencyResult<Self> {
        self.conditional().on_bean(selector)?;
        Ok(self)
    }

    /// 不存在匹配的 bean 时保留
    pub fn on_missing_bean(mut self, selector: &str) -> DependencyResult<Self> {
        self.conditional().on_missing_bean(selector)?;
        Ok(self)
    }

    /// 表达式条件
    pub fn on_expression(mut self, expression: &str) -> DependencyResult<Self> {
        self.conditional().on_expression(expression)?;
        Ok(self)
    }

    /// 自定义函数条件
    pub fn on_match<F>(mut self, func: F) -> DependencyResult<Self>
    where
        F: Fn(&mut dyn ConditionContext) -> DependencyResult<bool> + 'static,
    {
        self.conditional().on_match(func)?;
        Ok(self)
    }

    /// 与下一个条件按“与”连接
    pub fn and(mut self) -> Self {
        self.conditional().and();
        self
    }

    /// 与下一个条件按“或”连接
    pub fn or(mut self) -> Self {
        self.conditional().or();
        self
    }
}
