//! 类型化属性绑定器实现
//!
//! 目标类型通过 [`Bindable`] 描述自己如何从属性树中取值：标量从单个字符串解析，
//! 结构体逐字段递归（通常由 `#[derive(Bindable)]` 生成），切片和映射按索引或子键展开。

use crate::converter::ConverterRegistry;
use chrono::{DateTime, Utc};
use config_abstractions::{BindFilter, BindParam, PropertySource};
use infrastructure_common::{cast, expression, short_type_name, CastError, ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

static DEFAULT_CONVERTERS: Lazy<ConverterRegistry> = Lazy::new(ConverterRegistry::with_defaults);

/// 绑定目标的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// 从单个字符串解析的值
    Scalar,
    /// 逐字段绑定的结构体
    Struct,
    /// 切片
    Slice,
    /// 以字符串为键的映射
    Map,
    /// 不支持绑定的类型
    Unsupported,
}

/// 可绑定类型 trait
pub trait Bindable: Sized + 'static {
    /// 目标种类
    fn bind_kind() -> BindKind;

    /// 从字符串解析，只有标量类型需要实现
    fn parse_text(_text: &str) -> ConfigResult<Self> {
        Err(ConfigError::unsupported(format!(
            "unsupported bind type {}",
            short_type_name(std::any::type_name::<Self>())
        )))
    }

    /// 绑定后值的规范文本，校验表达式中的 `$` 以此替换；返回 `None` 时使用原始属性文本
    fn to_text(&self) -> Option<String> {
        None
    }

    /// 把属性绑定到自身
    fn bind_from(&mut self, binder: &Binder<'_>, param: &BindParam) -> ConfigResult<()>;
}

/// 属性绑定器
pub struct Binder<'a> {
    source: &'a dyn PropertySource,
    converters: &'a ConverterRegistry,
    filter: Option<&'a dyn BindFilter>,
}

impl<'a> Binder<'a> {
    /// 使用内置转换器创建绑定器
    pub fn new(source: &'a dyn PropertySource) -> Self {
        Self {
            source,
            converters: &DEFAULT_CONVERTERS,
            filter: None,
        }
    }

    /// 使用自定义转换器注册表
    pub fn with_converters(mut self, converters: &'a ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    /// 设置绑定过滤器
    pub fn with_filter(mut self, filter: &'a dyn BindFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// 属性来源
    pub fn source(&self) -> &dyn PropertySource {
        self.source
    }

    /// 转换器注册表
    pub fn converters(&self) -> &ConverterRegistry {
        self.converters
    }

    /// 按标签绑定目标
    pub fn bind<T: Bindable>(&self, target: &mut T, tag: &str) -> ConfigResult<()> {
        let path = short_type_name(std::any::type_name::<T>());
        debug!("绑定属性到类型: {} -> {}", tag, path);
        let param = BindParam::root(tag, path)?;
        self.bind_value(target, &param)
    }

    /// 按绑定参数绑定目标
    ///
    /// 注册了转换器的类型优先使用转换器，其余类型按自身的 [`Bindable`] 实现绑定
    pub fn bind_value<T: Bindable>(&self, target: &mut T, param: &BindParam) -> ConfigResult<()> {
        let result = match self.converters.get::<T>() {
            Some(convert) => self.bind_text(target, param, |text| convert(text)),
            None => target.bind_from(self, param),
        };
        result.map_err(|e| e.with_path(param.path.as_str()))
    }

    /// 绑定结构体字段
    pub fn bind_field<T: Bindable>(
        &self,
        target: &mut T,
        parent: &BindParam,
        field: &str,
        tag: &str,
        validate: Option<&str>,
    ) -> ConfigResult<()> {
        let param = parent
            .field(field, tag)
            .map_err(|e| e.with_path(format!("{}.{field}", parent.path)))?
            .with_validate(validate);
        self.bind_value(target, &param)
    }

    /// 绑定嵌入字段，沿用父级的键前缀
    pub fn bind_embedded<T: Bindable>(&self, target: &mut T, parent: &BindParam, field: &str) -> ConfigResult<()> {
        self.bind_value(target, &parent.embed(field))
    }

    /// 结构体不允许非空默认值
    pub fn check_struct(&self, param: &BindParam) -> ConfigResult<()> {
        if param.tag.has_non_empty_default() {
            return Err(ConfigError::DefaultNotAllowed { kind: "struct" });
        }
        Ok(())
    }

    /// 绑定标量
    pub fn bind_scalar<T: Bindable>(&self, target: &mut T, param: &BindParam) -> ConfigResult<()> {
        self.bind_text(target, param, T::parse_text)
    }

    fn bind_text<T, F>(&self, target: &mut T, param: &BindParam, parse: F) -> ConfigResult<()>
    where
        T: Bindable,
        F: Fn(&str) -> ConfigResult<T>,
    {
        if let Some(filter) = self.filter {
            if filter.filter(target, param)? {
                return Ok(());
            }
        }
        let text = self.resolve_text(param)?;
        let value = parse(&text)?;
        if let Some(expr) = &param.validate {
            let bound = value.to_text().unwrap_or(text);
            expression::validate(expr, &bound)?;
        }
        *target = value;
        Ok(())
    }

    /// 取得属性值：精确键，否则默认值，否则报错
    pub fn resolve_text(&self, param: &BindParam) -> ConfigResult<String> {
        match self.source.get(&param.key) {
            Some(value) => self.source.resolve(value),
            None => match &param.tag.default {
                Some(default) => self.source.resolve(default),
                None => Err(ConfigError::PropertyNotConfig {
                    key: param.key.clone(),
                }),
            },
        }
    }

    fn parse_element<T: Bindable>(&self, text: &str) -> ConfigResult<T> {
        match self.converters.get::<T>() {
            Some(convert) => convert(text),
            None => T::parse_text(text),
        }
    }

    fn is_text_like<T: Bindable>(&self) -> bool {
        self.converters.contains::<T>() || T::bind_kind() == BindKind::Scalar
    }

    /// 切片元素的原始字符串
    fn slice_texts(&self, param: &BindParam) -> ConfigResult<Vec<String>> {
        if let Some(value) = self.source.get(&param.key) {
            let value = self.source.resolve(value)?;
            if value.is_empty() {
                return Ok(Vec::new());
            }
            return self.converters.split(param.tag.splitter.as_deref(), &value);
        }

        if !param.key.is_empty() && self.source.has(&param.key) {
            let mut texts = Vec::new();
            loop {
                let item = param.index(texts.len());
                match self.source.get(&item.key) {
                    Some(value) => texts.push(self.source.resolve(value)?),
                    None if self.source.has(&item.key) => {
                        return Err(ConfigError::unsupported(format!(
                            "property \"{}\" isn't a simple value",
                            item.key
                        )))
                    }
                    None => break,
                }
            }
            return Ok(texts);
        }

        match &param.tag.default {
            Some(default) => {
                let value = self.source.resolve(default)?;
                if value.is_empty() {
                    Ok(Vec::new())
                } else {
                    self.converters.split(param.tag.splitter.as_deref(), &value)
                }
            }
            None => Err(ConfigError::PropertyNotConfig {
                key: param.key.clone(),
            }),
        }
    }

    fn bind_slice<T: Bindable + Default>(&self, param: &BindParam) -> ConfigResult<Vec<T>> {
        if param.tag.has_non_empty_default() {
            return Err(ConfigError::DefaultNotAllowed { kind: "slice" });
        }

        if self.is_text_like::<T>() {
            return self
                .slice_texts(param)?
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    self.parse_element::<T>(text)
                        .map_err(|e| e.with_path(param.index(i).path))
                })
                .collect();
        }

        let mut items = Vec::new();
        loop {
            let item = param.index(items.len());
            if !self.source.has(&item.key) {
                break;
            }
            let mut value = T::default();
            self.bind_value(&mut value, &item)?;
            items.push(value);
        }

        if items.is_empty() && !param.tag.has_default() && !self.source.has(&param.key) {
            return Err(ConfigError::PropertyNotConfig {
                key: param.key.clone(),
            });
        }
        Ok(items)
    }

    fn bind_entries<T: Bindable + Default>(&self, param: &BindParam) -> ConfigResult<Vec<(String, T)>> {
        if param.tag.has_non_empty_default() {
            return Err(ConfigError::DefaultNotAllowed { kind: "map" });
        }

        let names = self.source.sub_keys(&param.key);
        if names.is_empty() {
            return match self.source.get(&param.key) {
                Some(value) if !value.is_empty() => Err(ConfigError::unsupported(format!(
                    "property \"{}\" isn't a map",
                    param.key
                ))),
                Some(_) => Ok(Vec::new()),
                None if param.tag.has_default() => Ok(Vec::new()),
                None => Err(ConfigError::PropertyNotConfig {
                    key: param.key.clone(),
                }),
            };
        }

        names
            .into_iter()
            .map(|name| {
                let entry = param.entry(&name);
                let mut value = T::default();
                self.bind_value(&mut value, &entry)?;
                Ok((name, value))
            })
            .collect()
    }
}

impl std::fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("converters", self.converters)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

fn text_value(text: &str) -> Value {
    Value::String(text.to_string())
}

macro_rules! impl_scalar {
    ($($t:ty => $parse:expr $(; $text:expr)?),* $(,)?) => {
        $(
            impl Bindable for $t {
                fn bind_kind() -> BindKind {
                    BindKind::Scalar
                }

                fn parse_text(text: &str) -> ConfigResult<Self> {
                    let parse: fn(&str) -> ConfigResult<$t> = $parse;
                    parse(text)
                }

                $(
                    fn to_text(&self) -> Option<String> {
                        let text: fn(&$t) -> String = $text;
                        Some(text(self))
                    }
                )?

                fn bind_from(&mut self, binder: &Binder<'_>, param: &BindParam) -> ConfigResult<()> {
                    binder.bind_scalar(self, param)
                }
            }
        )*
    };
}

macro_rules! impl_integer {
    ($caster:path, $($t:ident),*) => {
        impl_scalar! {
            $(
                $t => |text| {
                    let value = $caster(&text_value(text))?;
                    $t::try_from(value)
                        .map_err(|_| CastError::new(text, "string", stringify!($t)).into())
                }; |v| v.to_string(),
            )*
        }
    };
}

impl_integer!(cast::to_u64_e, u8, u16, u32, u64, usize);
impl_integer!(cast::to_i64_e, i8, i16, i32, i64, isize);

impl_scalar! {
    f64 => |text| Ok(cast::to_f64_e(&text_value(text))?); |v| v.to_string(),
    f32 => |text| Ok(cast::to_f64_e(&text_value(text))? as f32); |v| v.to_string(),
    bool => |text| Ok(cast::to_bool_e(&text_value(text))?); |v| v.to_string(),
    String => |text| Ok(text.to_string()); |v| v.clone(),
    Duration => |text| Ok(cast::parse_duration(text)?),
    DateTime<Utc> => |text| Ok(cast::parse_time(text)?),
}

impl<T: Bindable + Default> Bindable for Vec<T> {
    fn bind_kind() -> BindKind {
        BindKind::Slice
    }

    fn bind_from(&mut self, binder: &Binder<'_>, param: &BindParam) -> ConfigResult<()> {
        *self = binder.bind_slice(param)?;
        Ok(())
    }
}

impl<T: Bindable + Default> Bindable for HashMap<String, T> {
    fn bind_kind() -> BindKind {
        BindKind::Map
    }

    fn bind_from(&mut self, binder: &Binder<'_>, param: &BindParam) -> ConfigResult<()> {
        *self = binder.bind_entries(param)?.into_iter().collect();
        Ok(())
    }
}

impl<T: Bindable + Default> Bindable for BTreeMap<String, T> {
    fn bind_kind() -> BindKind {
        BindKind::Map
    }

    fn bind_from(&mut self, binder: &Binder<'_>, param: &BindParam) -> ConfigResult<()> {
        *self = binder.bind_entries(param)?.into_iter().collect();
        Ok(())
    }
}

impl<T: Bindable, const N: usize> Bindable for [T; N] {
    fn bind_kind() -> BindKind {
        BindKind::Unsupported
    }

    fn bind_from(&mut self, _: &Binder<'_>, _: &BindParam) -> ConfigResult<()> {
        Err(ConfigError::unsupported("use slice instead of array"))
    }
}

impl<T: Bindable> Bindable for Option<T> {
    fn bind_kind() -> BindKind {
        BindKind::Unsupported
    }

    fn bind_from(&mut self, _: &Binder<'_>, _: &BindParam) -> ConfigResult<()> {
        Err(ConfigError::unsupported("target should be value type"))
    }
}

impl<T: Bindable> Bindable for Box<T> {
    fn bind_kind() -> BindKind {
        BindKind::Unsupported
    }

    fn bind_from(&mut self, _: &Binder<'_>, _: &BindParam) -> ConfigResult<()> {
        Err(ConfigError::unsupported("target should be value type"))
    }
}
