//! bean 装配引擎
//!
//! 对象 bean 在装配完成之前由定义独占，装配完成后才冻结为 `Arc`，
//! 因此循环依赖只会表现为装配栈上的重入，不会观察到半成品实例。

use crate::container::Container;
use crate::definition::AnyArc;
use config_impl::{Bindable, Binder, Properties};
use config_abstractions::BindParam;
use di_abstractions::{BeanSelector, BeanStatus};
use infrastructure_common::{short_type_name, DependencyError, DependencyResult, TypeInfo};
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// 可装配的 bean
///
/// `#[derive(Bean)]` 根据字段属性生成实现，没有字段需要注入时使用默认实现即可
pub trait Wirable: Send + Sync + 'static {
    /// 绑定属性并注入依赖
    fn wire(&mut self, ctx: &mut WireContext<'_>) -> DependencyResult<()> {
        let _ = ctx;
        Ok(())
    }
}

impl<T: ?Sized + Send + Sync + 'static> Wirable for Vec<Arc<T>> {}

/// 可注入的字段类型
pub trait Injectable {
    /// 按选择器注入
    fn inject(&mut self, ctx: &mut WireContext<'_>, selector: &BeanSelector) -> DependencyResult<()>;
}

impl<T: ?Sized + Send + Sync + 'static> Injectable for Option<Arc<T>> {
    fn inject(&mut self, ctx: &mut WireContext<'_>, selector: &BeanSelector) -> DependencyResult<()> {
        if selector.collection {
            return Err(DependencyError::Unsupported {
                message: format!(
                    "collection selector \"{selector}\" needs a Vec<Arc<{}>> target",
                    short_type_name(std::any::type_name::<T>())
                ),
            });
        }
        if let Some(bean) = ctx.get_bean::<T>(selector)? {
            *self = Some(bean);
        }
        Ok(())
    }
}

impl<T: ?Sized + Send + Sync + 'static> Injectable for Vec<Arc<T>> {
    fn inject(&mut self, ctx: &mut WireContext<'_>, selector: &BeanSelector) -> DependencyResult<()> {
        if selector.collection || selector.is_any() {
            *self = ctx.collect_beans::<T>(selector)?;
            return Ok(());
        }
        if let Some(beans) = ctx.get_bean::<Vec<Arc<T>>>(selector)? {
            *self = beans.as_ref().clone();
        }
        Ok(())
    }
}

/// 装配上下文，持有容器并记录当前正在装配的 bean
pub struct WireContext<'a> {
    container: &'a mut Container,
    bean: Option<usize>,
}

impl<'a> WireContext<'a> {
    pub(crate) fn new(container: &'a mut Container, bean: Option<usize>) -> Self {
        Self { container, bean }
    }

    /// 属性存储
    pub fn properties(&self) -> &Properties {
        self.container.properties()
    }

    /// 使用容器的转换器创建绑定器
    pub fn binder(&self) -> Binder<'_> {
        self.container.binder()
    }

    /// 按标签绑定属性
    pub fn bind<T: Bindable>(&self, target: &mut T, tag: &str) -> DependencyResult<()> {
        Ok(self.binder().bind(target, tag)?)
    }

    /// 绑定字段的属性值，`validate` 为可选的校验表达式
    pub fn bind_field<T: Bindable>(
        &self,
        target: &mut T,
        field: &str,
        tag: &str,
        validate: Option<&str>,
    ) -> DependencyResult<()> {
        let param = BindParam::root(tag, self.field_path(field))?.with_validate(validate);
        Ok(self.binder().bind_value(target, &param)?)
    }

    /// 按选择器字符串注入字段
    pub fn autowire<V: Injectable>(&mut self, target: &mut V, field: &str, selector: &str) -> DependencyResult<()> {
        let selector = BeanSelector::parse(selector).map_err(|e| e.with_field(field))?;
        debug!("注入字段 {} <- \"{}\"", self.field_path(field), selector);
        target.inject(self, &selector).map_err(|e| e.with_field(field))
    }

    /// 装配嵌套的结构体字段
    pub fn wire_nested<T: Wirable>(&mut self, target: &mut T, field: &str) -> DependencyResult<()> {
        target.wire(self).map_err(|e| e.with_field(field))
    }

    /// 查找单个 bean，可空选择器找不到时返回 `None`
    pub fn get_bean<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        selector: &BeanSelector,
    ) -> DependencyResult<Option<Arc<T>>> {
        let Some(id) = self.container.select_single::<T>(selector, self.bean)? else {
            return Ok(None);
        };
        self.container.wire_bean(id)?;
        self.container.cast_instance::<T>(id).map(Some)
    }

    /// 收集所有可作为 `T` 使用的 bean
    pub fn collect_beans<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        selector: &BeanSelector,
    ) -> DependencyResult<Vec<Arc<T>>> {
        let items = self.container.gather::<T>(self.bean)?;
        if items.is_empty() && !selector.nullable {
            return Err(DependencyError::BeanNotFound {
                selector: describe::<T>(selector),
            });
        }
        Ok(items)
    }

    fn field_path(&self, field: &str) -> String {
        match self.bean {
            Some(id) => format!("{}.{field}", self.container.defs[id].type_info.short_name()),
            None => field.to_string(),
        }
    }
}

/// 选择器的可读形式，没有类型名时补上目标类型
pub(crate) fn describe<T: ?Sized + 'static>(selector: &BeanSelector) -> String {
    if selector.type_name.is_empty() && !selector.collection {
        let mut s = format!("{}:{}", TypeInfo::of::<T>().short_name(), selector.bean_name);
        if selector.nullable {
            s.push('?');
        }
        s
    } else {
        selector.to_string()
    }
}

impl Container {
    /// 装配 bean，已装配时直接返回
    pub(crate) fn wire_bean(&mut self, id: usize) -> DependencyResult<()> {
        match self.defs[id].status {
            BeanStatus::Wired => return Ok(()),
            BeanStatus::Deleted => {
                return Err(DependencyError::BeanDeleted {
                    bean: self.defs[id].description(),
                })
            }
            BeanStatus::Wiring => {
                return Err(DependencyError::CircularDependency {
                    path: self.cycle_path(id),
                })
            }
            BeanStatus::Default | BeanStatus::Resolving => {
                return Err(DependencyError::Unsupported {
                    message: format!("bean {} is not resolved", self.defs[id].description()),
                })
            }
            BeanStatus::Resolved => {}
        }

        debug!("开始装配 bean: {}", self.defs[id].description());
        self.defs[id].status = BeanStatus::Wiring;
        self.stack.push(id);

        let result = self.build_bean(id);
        self.stack.pop();

        let instance = result?;
        let def = &mut self.defs[id];
        def.instance = Some(instance);
        def.status = BeanStatus::Wired;
        debug!("bean 装配完成: {}", def.description());
        Ok(())
    }

    fn build_bean(&mut self, id: usize) -> DependencyResult<AnyArc> {
        let depends_on = self.defs[id].depends_on.clone();
        for selector in &depends_on {
            let dep = self.select_any(selector, Some(id))?;
            self.wire_bean(dep)?;
        }

        let factory = self.defs[id].factory.take().ok_or_else(|| DependencyError::Unsupported {
            message: format!("bean {} has no factory", self.defs[id].description()),
        })?;
        let mut ctx = WireContext::new(self, Some(id));
        factory(&mut ctx)
    }

    fn cycle_path(&self, id: usize) -> String {
        let start = self.stack.iter().position(|&i| i == id).unwrap_or(0);
        self.stack[start..]
            .iter()
            .chain(std::iter::once(&id))
            .map(|&i| self.defs[i].description())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// 候选 bean：可作为 `T` 使用、未删除、匹配选择器、不是请求方自身
    pub(crate) fn candidates<T: ?Sized + 'static>(&self, selector: &BeanSelector, exclude: Option<usize>) -> Vec<usize> {
        self.type_index
            .get(&TypeId::of::<T>())
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&i| Some(i) != exclude)
                    .filter(|&i| self.defs[i].status != BeanStatus::Deleted && self.defs[i].matches(selector))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 按首选规则从候选中选出唯一的 bean
    pub(crate) fn select_single<T: ?Sized + 'static>(
        &self,
        selector: &BeanSelector,
        exclude: Option<usize>,
    ) -> DependencyResult<Option<usize>> {
        let ids = self.candidates::<T>(selector, exclude);
        self.pick(ids, selector, || describe::<T>(selector))
    }

    /// 不限定 Rust 类型，只按选择器中的类型名和名称查找
    fn select_any(&self, selector: &BeanSelector, exclude: Option<usize>) -> DependencyResult<usize> {
        let ids: Vec<usize> = (0..self.defs.len())
            .filter(|&i| Some(i) != exclude)
            .filter(|&i| self.defs[i].status != BeanStatus::Deleted && self.defs[i].matches(selector))
            .collect();
        let required = BeanSelector {
            nullable: false,
            ..selector.clone()
        };
        self.pick(ids, &required, || selector.to_string())?
            .ok_or_else(|| DependencyError::BeanNotFound {
                selector: selector.to_string(),
            })
    }

    fn pick(
        &self,
        ids: Vec<usize>,
        selector: &BeanSelector,
        describe: impl Fn() -> String,
    ) -> DependencyResult<Option<usize>> {
        match ids.len() {
            0 if selector.nullable => Ok(None),
            0 => Err(DependencyError::BeanNotFound { selector: describe() }),
            1 => Ok(Some(ids[0])),
            count => {
                let primaries: Vec<usize> = ids.iter().copied().filter(|&i| self.defs[i].primary).collect();
                match primaries.len() {
                    1 => Ok(Some(primaries[0])),
                    0 => Err(DependencyError::AmbiguousBeans {
                        selector: describe(),
                        count,
                        descriptions: self.descriptions(&ids),
                    }),
                    n => Err(DependencyError::MultiplePrimary {
                        selector: describe(),
                        count: n,
                        descriptions: self.descriptions(&primaries),
                    }),
                }
            }
        }
    }

    fn descriptions(&self, ids: &[usize]) -> String {
        ids.iter()
            .map(|&i| self.defs[i].description())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 把已装配的实例转换为 `Arc<T>`
    pub(crate) fn cast_instance<T: ?Sized + 'static>(&self, id: usize) -> DependencyResult<Arc<T>> {
        let def = &self.defs[id];
        let mismatch = || DependencyError::TypeMismatch {
            bean: def.description(),
            expected: short_type_name(std::any::type_name::<T>()),
        };
        let instance = def.instance.clone().ok_or_else(|| DependencyError::Unsupported {
            message: format!("bean {} is not wired", def.description()),
        })?;
        let caster = def.caster(TypeId::of::<T>()).ok_or_else(mismatch)?;
        let boxed = caster(instance).ok_or_else(mismatch)?;
        boxed.downcast::<Arc<T>>().map(|bean| *bean).map_err(|_| mismatch())
    }

    /// 收集集合注入的元素
    ///
    /// 先拼接类型为 `Vec<Arc<T>>` 的 bean，再追加可作为 `T` 使用的单个 bean。
    /// 请求方自身不在结果中，此时不缓存；元素仍在装配中时报告循环依赖
    pub(crate) fn gather<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        exclude: Option<usize>,
    ) -> DependencyResult<Vec<Arc<T>>> {
        let key = TypeId::of::<T>();
        if let Some(cached) = self
            .collection_cache
            .get(&key)
            .and_then(|c| c.downcast_ref::<Vec<(usize, Arc<T>)>>())
        {
            return Ok(cached
                .iter()
                .filter(|(src, _)| Some(*src) != exclude)
                .map(|(_, bean)| Arc::clone(bean))
                .collect());
        }

        let any = BeanSelector::any();
        let mut items: Vec<(usize, Arc<T>)> = Vec::new();
        let mut excluded = false;

        for id in self.candidates::<Vec<Arc<T>>>(&any, None) {
            if Some(id) == exclude {
                excluded = true;
                continue;
            }
            self.wire_bean(id)?;
            let beans = self.cast_instance::<Vec<Arc<T>>>(id)?;
            items.extend(beans.iter().map(|bean| (id, Arc::clone(bean))));
        }

        for id in self.candidates::<T>(&any, None) {
            if Some(id) == exclude {
                excluded = true;
                continue;
            }
            self.wire_bean(id)?;
            items.push((id, self.cast_instance::<T>(id)?));
        }

        let result = items
            .iter()
            .filter(|(src, _)| Some(*src) != exclude)
            .map(|(_, bean)| Arc::clone(bean))
            .collect();
        if !excluded {
            self.collection_cache.insert(key, Box::new(items));
        }
        Ok(result)
    }
}
