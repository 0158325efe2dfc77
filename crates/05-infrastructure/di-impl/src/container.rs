//! bean 容器
//!
//! 容器的生命周期分为两个阶段：先注册 bean 定义，再调用
//! [`Container::auto_wire_beans`] 冻结。冻结时依次求值 profile 与注册条件，
//! 删除不满足条件的定义，然后按注册顺序装配其余 bean。

use crate::args::Constructor;
use crate::definition::{AnyArc, BeanDefinition, Factory};
use crate::registration::Registration;
use crate::wiring::{WireContext, Wirable};
use config_abstractions::PropertySource;
use config_impl::{Binder, ConverterRegistry, Properties};
use di_abstractions::{
    BeanInfo, BeanKind, BeanSelector, BeanStatus, ConditionContext, ProfileCondition, Condition,
};
use infrastructure_common::{short_type_name, DependencyError, DependencyResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 指定激活 profile 的属性名
pub const ACTIVE_PROFILES_PROPERTY: &str = "spring.profiles.active";

/// bean 容器
pub struct Container {
    pub(crate) properties: Properties,
    pub(crate) converters: ConverterRegistry,
    pub(crate) profile: Option<String>,
    pub(crate) defs: Vec<BeanDefinition>,
    pub(crate) type_index: HashMap<TypeId, Vec<usize>>,
    pub(crate) name_index: HashMap<String, Vec<usize>>,
    pub(crate) collection_cache: HashMap<TypeId, Box<dyn Any>>,
    pub(crate) stack: Vec<usize>,
    resolving: Option<usize>,
    frozen: bool,
}

impl Container {
    /// 创建空容器
    pub fn new() -> Self {
        Self::with_properties(Properties::new())
    }

    /// 使用已有的属性创建容器
    pub fn with_properties(properties: Properties) -> Self {
        Self {
            properties,
            converters: ConverterRegistry::with_defaults(),
            profile: None,
            defs: Vec::new(),
            type_index: HashMap::new(),
            name_index: HashMap::new(),
            collection_cache: HashMap::new(),
            stack: Vec::new(),
            resolving: None,
            frozen: false,
        }
    }

    /// 属性存储
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// 可变的属性存储
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// 设置属性
    pub fn set_property(&mut self, key: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.properties.set(key, value);
        self
    }

    /// 加载配置文件
    pub fn load_properties(&mut self, path: impl AsRef<Path>) -> DependencyResult<()> {
        Ok(self.properties.load(path)?)
    }

    /// 转换器注册表
    pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    /// 使用容器的属性和转换器创建绑定器
    pub fn binder(&self) -> Binder<'_> {
        Binder::new(&self.properties).with_converters(&self.converters)
    }

    /// 设置激活的 profile，优先于 `spring.profiles.active` 属性
    pub fn set_profile(&mut self, profile: impl Into<String>) -> &mut Self {
        self.profile = Some(profile.into());
        self
    }

    /// 当前激活的 profile
    pub fn active_profile(&self) -> Option<&str> {
        self.profile
            .as_deref()
            .or_else(|| self.properties.get(ACTIVE_PROFILES_PROPERTY))
            .filter(|p| !p.trim().is_empty())
    }

    /// 是否已经冻结
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// 注册对象 bean，名称默认为去掉模块路径的类型名
    #[track_caller]
    pub fn register_bean<T: Wirable>(&mut self, bean: T) -> DependencyResult<Registration<'_, T>> {
        self.register_name_bean(short_type_name(std::any::type_name::<T>()), bean)
    }

    /// 注册带名称的对象 bean
    #[track_caller]
    pub fn register_name_bean<T: Wirable>(
        &mut self,
        name: impl Into<String>,
        bean: T,
    ) -> DependencyResult<Registration<'_, T>> {
        let mut bean = bean;
        let factory: Factory = Box::new(move |ctx: &mut WireContext<'_>| {
            bean.wire(ctx)?;
            Ok(Arc::new(bean) as AnyArc)
        });
        let def = BeanDefinition::new::<T>(name.into(), BeanKind::Object, Location::caller(), factory);
        self.add_definition(def)
    }

    /// 注册构造函数 bean，`tags` 与参数一一对应，缺省的参数按类型注入
    #[track_caller]
    pub fn register_bean_fn<Args, F>(
        &mut self,
        ctor: F,
        tags: &[&str],
    ) -> DependencyResult<Registration<'_, F::Output>>
    where
        F: Constructor<Args>,
        F::Output: Wirable,
    {
        self.register_ctor(ctor, tags, BeanKind::Constructor, Location::caller(), Ok)
    }

    /// 注册返回 `Result` 的构造函数 bean，返回错误时装配失败
    #[track_caller]
    pub fn register_bean_try_fn<Args, F, T, E>(
        &mut self,
        ctor: F,
        tags: &[&str],
    ) -> DependencyResult<Registration<'_, T>>
    where
        F: Constructor<Args, Output = Result<T, E>>,
        T: Wirable,
        E: Into<anyhow::Error> + 'static,
    {
        self.register_ctor(ctor, tags, BeanKind::Constructor, Location::caller(), |r| {
            r.map_err(Into::into)
        })
    }

    /// 注册方法 bean，函数的第一个参数是 `parent` 选择的父 bean
    #[track_caller]
    pub fn register_method_bean<Args, F>(
        &mut self,
        parent: &str,
        method: F,
        tags: &[&str],
    ) -> DependencyResult<Registration<'_, F::Output>>
    where
        F: Constructor<Args>,
        F::Output: Wirable,
    {
        BeanSelector::parse(parent)?;
        let mut all = Vec::with_capacity(tags.len() + 1);
        all.push(parent);
        all.extend_from_slice(tags);
        self.register_ctor(method, &all, BeanKind::Method, Location::caller(), Ok)
    }

    fn register_ctor<Args, F, T, R>(
        &mut self,
        ctor: F,
        tags: &[&str],
        kind: BeanKind,
        location: &'static Location<'static>,
        unwrap: R,
    ) -> DependencyResult<Registration<'_, T>>
    where
        F: Constructor<Args>,
        T: Wirable,
        R: Fn(F::Output) -> Result<T, anyhow::Error> + 'static,
    {
        let name = short_type_name(std::any::type_name::<T>());
        if tags.len() > ctor.arity() {
            return Err(DependencyError::Unsupported {
                message: format!(
                    "{} has {} arguments but {} tags are given",
                    name,
                    ctor.arity(),
                    tags.len()
                ),
            });
        }

        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let description = format!("{}@{}:{}", name, location.file(), location.line());
        let factory: Factory = Box::new(move |ctx: &mut WireContext<'_>| {
            let output = ctor.invoke(ctx, &tags)?;
            let mut bean = unwrap(output).map_err(|e| DependencyError::ConstructorFailed {
                bean: description,
                source: e.into(),
            })?;
            bean.wire(ctx)?;
            Ok(Arc::new(bean) as AnyArc)
        });
        let def = BeanDefinition::new::<T>(name, kind, location, factory);
        self.add_definition(def)
    }

    fn add_definition<T: Wirable>(&mut self, def: BeanDefinition) -> DependencyResult<Registration<'_, T>> {
        if self.frozen {
            return Err(DependencyError::RegistrationClosed {
                bean: def.description(),
            });
        }

        let type_id = def.type_info.id;
        if let Some(ids) = self.type_index.get(&type_id) {
            if let Some(&existing) = ids
                .iter()
                .find(|&&i| self.defs[i].type_info.id == type_id && self.defs[i].name == def.name)
            {
                return Err(DependencyError::AlreadyRegistered {
                    bean: self.defs[existing].description(),
                });
            }
        }

        let id = self.defs.len();
        debug!("注册 bean: {} ({})", def.description(), def.kind);
        self.type_index.entry(type_id).or_default().push(id);
        self.name_index.entry(def.name.clone()).or_default().push(id);
        self.defs.push(def);
        Ok(Registration::new(self, id))
    }

    /// 冻结容器并装配所有 bean
    ///
    /// 只能调用一次，之后不再接受注册
    pub fn auto_wire_beans(&mut self) -> DependencyResult<()> {
        if self.frozen {
            return Err(DependencyError::RegistrationClosed {
                bean: "auto_wire_beans".to_string(),
            });
        }
        self.frozen = true;
        info!(
            "开始装配 bean，共 {} 个定义，profile: {}",
            self.defs.len(),
            self.active_profile().unwrap_or("-")
        );

        for id in 0..self.defs.len() {
            self.resolve_bean(id)?;
        }

        for id in 0..self.defs.len() {
            if self.defs[id].status != BeanStatus::Deleted {
                self.wire_bean(id)?;
            }
        }

        let deleted = self
            .defs
            .iter()
            .filter(|d| d.status == BeanStatus::Deleted)
            .count();
        info!(
            "bean 装配完成: {} 个 bean，{} 个因条件不满足被删除",
            self.defs.len() - deleted,
            deleted
        );
        Ok(())
    }

    /// 求值 profile 与注册条件
    fn resolve_bean(&mut self, id: usize) -> DependencyResult<()> {
        match self.defs[id].status {
            BeanStatus::Default => {}
            BeanStatus::Resolving => {
                return Err(DependencyError::CircularDependency {
                    path: format!("{} (condition)", self.defs[id].description()),
                })
            }
            _ => return Ok(()),
        }

        self.defs[id].status = BeanStatus::Resolving;
        let outer = self.resolving.replace(id);

        let conditional = std::mem::take(&mut self.defs[id].conditional);
        let result = self.check_conditions(id, &conditional);
        self.defs[id].conditional = conditional;
        self.resolving = outer;

        if result? {
            self.defs[id].status = BeanStatus::Resolved;
        } else {
            self.delete_bean(id);
        }
        Ok(())
    }

    fn check_conditions(&mut self, id: usize, conditional: &di_abstractions::Conditional) -> DependencyResult<bool> {
        if let Some(profile) = self.defs[id].profile.clone() {
            if !ProfileCondition::new(profile).matches(self)? {
                return Ok(false);
            }
        }
        conditional.matches(self)
    }

    fn delete_bean(&mut self, id: usize) {
        debug!("bean 因 profile 或条件不满足被删除: {}", self.defs[id].description());
        self.defs[id].status = BeanStatus::Deleted;
        for ids in self.type_index.values_mut() {
            ids.retain(|&i| i != id);
        }
        if let Some(ids) = self.name_index.get_mut(&self.defs[id].name) {
            ids.retain(|&i| i != id);
        }
    }

    /// 冻结后按选择器获取单个 bean
    pub fn get_bean<T: ?Sized + Send + Sync + 'static>(&self, selector: &str) -> DependencyResult<Arc<T>> {
        self.ensure_frozen()?;
        let selector = BeanSelector {
            nullable: false,
            ..BeanSelector::parse(selector)?
        };
        match self.select_single::<T>(&selector, None)? {
            Some(id) => self.cast_instance::<T>(id),
            None => Err(DependencyError::BeanNotFound {
                selector: crate::wiring::describe::<T>(&selector),
            }),
        }
    }

    /// 按选择器查找 bean，只看类型名和名称
    pub fn find_bean(&self, selector: &str) -> DependencyResult<Vec<BeanInfo>> {
        let selector = BeanSelector::parse(selector)?;
        Ok(self.matching(&selector).into_iter().map(|i| self.defs[i].info()).collect())
    }

    /// 冻结后收集所有可作为 `T` 使用的 bean
    pub fn collect_beans<T: ?Sized + Send + Sync + 'static>(&self) -> DependencyResult<Vec<Arc<T>>> {
        self.ensure_frozen()?;
        let any = BeanSelector::any();
        let mut beans = Vec::new();
        for id in self.candidates::<Vec<Arc<T>>>(&any, None) {
            beans.extend(self.cast_instance::<Vec<Arc<T>>>(id)?.iter().cloned());
        }
        for id in self.candidates::<T>(&any, None) {
            beans.push(self.cast_instance::<T>(id)?);
        }
        Ok(beans)
    }

    /// 全部 bean 定义，包括已删除的
    pub fn definitions(&self) -> impl Iterator<Item = &BeanDefinition> {
        self.defs.iter()
    }

    fn ensure_frozen(&self) -> DependencyResult<()> {
        if self.frozen {
            Ok(())
        } else {
            Err(DependencyError::Unsupported {
                message: "beans are available after auto_wire_beans".to_string(),
            })
        }
    }

    fn matching(&self, selector: &BeanSelector) -> Vec<usize> {
        let ids: Box<dyn Iterator<Item = usize>> = if selector.bean_name.is_empty() {
            Box::new(0..self.defs.len())
        } else {
            Box::new(
                self.name_index
                    .get(&selector.bean_name)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter(),
            )
        };
        ids.filter(|&i| self.defs[i].status != BeanStatus::Deleted && self.defs[i].matches(selector))
            .collect()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionContext for Container {
    fn properties(&self) -> &dyn PropertySource {
        &self.properties
    }

    fn find_bean(&mut self, selector: &BeanSelector) -> DependencyResult<Vec<BeanInfo>> {
        let mut found = Vec::new();
        for id in self.matching(selector) {
            if Some(id) == self.resolving {
                continue;
            }
            self.resolve_bean(id)?;
            if self.defs[id].status != BeanStatus::Deleted {
                found.push(self.defs[id].info());
            }
        }
        Ok(found)
    }

    fn profile(&self) -> Option<&str> {
        self.active_profile()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("beans", &self.defs)
            .field("profile", &self.profile)
            .field("frozen", &self.frozen)
            .finish()
    }
}
