//! 类型转换器注册表
//!
//! 为不实现 [`crate::Bindable`] 标量解析的类型提供字符串转换函数，
//! 同时管理切片绑定使用的命名拆分器。

use chrono::{DateTime, Utc};
use infrastructure_common::{cast, ConfigError, ConfigResult, TypeInfo};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 转换函数
pub type ConvertFn<T> = dyn Fn(&str) -> ConfigResult<T> + Send + Sync;

/// 拆分函数
pub type SplitFn = dyn Fn(&str) -> ConfigResult<Vec<String>> + Send + Sync;

struct ConverterEntry {
    type_info: TypeInfo,
    // Arc<ConvertFn<T>>
    func: Box<dyn Any + Send + Sync>,
}

/// 转换器注册表
///
/// 以目标类型为键，同一类型重复注册时后注册者生效
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, ConverterEntry>,
    splitters: HashMap<String, Arc<SplitFn>>,
}

impl ConverterRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建包含内置转换器的注册表（时长、时间）
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<Duration, _, _>(cast::parse_duration);
        registry.register::<DateTime<Utc>, _, _>(cast::parse_time);
        registry
    }

    /// 注册转换函数
    pub fn register<T, E, F>(&mut self, func: F) -> &mut Self
    where
        T: 'static,
        E: fmt::Display,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let type_info = TypeInfo::of::<T>();
        let wrapped: Arc<ConvertFn<T>> = Arc::new(move |s: &str| {
            func(s).map_err(|e| ConfigError::Converter {
                type_name: type_info.short_name(),
                message: e.to_string(),
            })
        });

        let entry = ConverterEntry {
            type_info,
            func: Box::new(wrapped),
        };
        if self.converters.insert(type_info.id, entry).is_some() {
            warn!("类型 {} 的转换器被重新注册，使用新的转换器", type_info.short_name());
        } else {
            debug!("注册类型转换器: {}", type_info.short_name());
        }
        self
    }

    /// 查找转换函数
    pub fn get<T: 'static>(&self) -> Option<Arc<ConvertFn<T>>> {
        self.converters
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.func.downcast_ref::<Arc<ConvertFn<T>>>())
            .cloned()
    }

    /// 是否注册了该类型的转换器
    pub fn contains<T: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    /// 使用已注册的转换器转换字符串
    pub fn convert<T: 'static>(&self, text: &str) -> Option<ConfigResult<T>> {
        self.get::<T>().map(|f| f(text))
    }

    /// 注册命名拆分器
    pub fn register_splitter<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&str) -> ConfigResult<Vec<String>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.splitters.insert(name.clone(), Arc::new(func)).is_some() {
            warn!("拆分器 {} 被重新注册", name);
        }
        self
    }

    /// 拆分字符串
    ///
    /// 未指定拆分器时按逗号拆分并去掉首尾空白
    pub fn split(&self, splitter: Option<&str>, text: &str) -> ConfigResult<Vec<String>> {
        match splitter {
            None => Ok(text.split(',').map(|s| s.trim().to_string()).collect()),
            Some(name) => {
                let func = self
                    .splitters
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownSplitter { name: name.to_string() })?;
                func(text)
            }
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<String> = self.converters.values().map(|e| e.type_info.short_name()).collect();
        types.sort();
        let mut splitters: Vec<&String> = self.splitters.keys().collect();
        splitters.sort();
        f.debug_struct("ConverterRegistry")
            .field("converters", &types)
            .field("splitters", &splitters)
            .finish()
    }
}
