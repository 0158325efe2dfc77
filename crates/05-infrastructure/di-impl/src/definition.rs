//! bean 定义

use crate::wiring::WireContext;
use di_abstractions::{BeanInfo, BeanKind, BeanSelector, BeanStatus, Conditional};
use infrastructure_common::{DependencyResult, TypeInfo};
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// 装配完成后保存的 bean 实例
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// 把实例转换为 `Box<Arc<X>>`，X 为自身类型或导出的类型
pub(crate) type Caster = Arc<dyn Fn(AnyArc) -> Option<Box<dyn Any>> + Send + Sync>;

/// 创建并装配实例，只会被调用一次
pub(crate) type Factory = Box<dyn FnOnce(&mut WireContext<'_>) -> DependencyResult<AnyArc>>;

/// bean 定义
pub struct BeanDefinition {
    pub(crate) name: String,
    pub(crate) type_info: TypeInfo,
    pub(crate) kind: BeanKind,
    pub(crate) status: BeanStatus,
    pub(crate) primary: bool,
    pub(crate) profile: Option<String>,
    pub(crate) depends_on: Vec<BeanSelector>,
    pub(crate) conditional: Conditional,
    pub(crate) location: &'static Location<'static>,
    pub(crate) casters: Vec<(TypeInfo, Caster)>,
    pub(crate) factory: Option<Factory>,
    pub(crate) instance: Option<AnyArc>,
}

impl BeanDefinition {
    pub(crate) fn new<T: Any + Send + Sync>(
        name: String,
        kind: BeanKind,
        location: &'static Location<'static>,
        factory: Factory,
    ) -> Self {
        let own: Caster = Arc::new(|instance: AnyArc| {
            instance
                .downcast::<T>()
                .ok()
                .map(|bean| Box::new(bean) as Box<dyn Any>)
        });
        Self {
            name,
            type_info: TypeInfo::of::<T>(),
            kind,
            status: BeanStatus::Default,
            primary: false,
            profile: None,
            depends_on: Vec::new(),
            conditional: Conditional::new(),
            location,
            casters: vec![(TypeInfo::of::<T>(), own)],
            factory: Some(factory),
            instance: None,
        }
    }

    /// bean 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// bean 自身类型
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 当前状态
    pub fn status(&self) -> BeanStatus {
        self.status
    }

    /// 种类
    pub fn kind(&self) -> BeanKind {
        self.kind
    }

    /// 是否为首选 bean
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// 描述，形如 `name@file:line`
    pub fn description(&self) -> String {
        format!("{}@{}:{}", self.name, self.location.file(), self.location.line())
    }

    /// 能否作为给定类型使用
    pub(crate) fn provides(&self, id: TypeId) -> bool {
        self.casters.iter().any(|(info, _)| info.id == id)
    }

    /// 自身类型或导出类型的名称是否匹配
    pub(crate) fn matches_type_name(&self, name: &str) -> bool {
        self.casters.iter().any(|(info, _)| info.matches(name))
    }

    pub(crate) fn matches(&self, selector: &BeanSelector) -> bool {
        selector.matches_name(&self.name) && self.matches_type_name(&selector.type_name)
    }

    pub(crate) fn caster(&self, id: TypeId) -> Option<&Caster> {
        self.casters
            .iter()
            .find(|(info, _)| info.id == id)
            .map(|(_, caster)| caster)
    }

    /// 只读描述
    pub fn info(&self) -> BeanInfo {
        BeanInfo {
            name: self.name.clone(),
            type_info: self.type_info,
            exports: self.casters.iter().skip(1).map(|(info, _)| *info).collect(),
            description: self.description(),
            kind: self.kind,
            primary: self.primary,
            status: self.status,
        }
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("type", &self.type_info.name)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("primary", &self.primary)
            .field("location", &format_args!("{}:{}", self.location.file(), self.location.line()))
            .finish()
    }
}

impl fmt::Display for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
