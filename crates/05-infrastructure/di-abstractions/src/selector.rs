//! bean 选择器
//!
//! 语法为 `TypeName:beanName`，两部分都可以为空表示任意；只写一个不带冒号的
//! 名称时按 bean 名称匹配。末尾的 `?` 表示可空，`[]` 和 `[]?` 表示集合注入。
//! Rust 类型名中的 `::` 不会被当作分隔符。

use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::fmt;
use std::str::FromStr;

/// bean 选择器
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BeanSelector {
    /// 类型名称，为空时匹配任意类型
    pub type_name: String,
    /// bean 名称，为空时匹配任意名称
    pub bean_name: String,
    /// 找不到时是否允许为空
    pub nullable: bool,
    /// 是否为集合注入
    pub collection: bool,
}

impl BeanSelector {
    /// 解析选择器字符串
    pub fn parse(selector: &str) -> DependencyResult<Self> {
        let s = selector.trim();
        let (s, nullable) = match s.strip_suffix('?') {
            Some(rest) => (rest.trim_end(), true),
            None => (s, false),
        };

        if s == "[]" {
            return Ok(Self {
                nullable,
                collection: true,
                ..Self::default()
            });
        }

        if s.contains('[') || s.contains('?') {
            return Err(DependencyError::InvalidSelector {
                selector: selector.to_string(),
                reason: "unexpected \"[\" or \"?\"".to_string(),
            });
        }

        let (type_name, bean_name) = match find_separator(s) {
            Some(pos) => (s[..pos].trim(), s[pos + 1..].trim()),
            None => ("", s),
        };

        Ok(Self {
            type_name: type_name.to_string(),
            bean_name: bean_name.to_string(),
            nullable,
            collection: false,
        })
    }

    /// 匹配任意 bean 的选择器
    pub fn any() -> Self {
        Self::default()
    }

    /// 按名称选择
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            bean_name: name.into(),
            ..Self::default()
        }
    }

    /// 按类型选择
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Self {
            type_name: TypeInfo::of::<T>().name.to_string(),
            ..Self::default()
        }
    }

    /// 设置为可空
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// 类型和名称都未指定
    pub fn is_any(&self) -> bool {
        self.type_name.is_empty() && self.bean_name.is_empty()
    }

    /// bean 名称是否匹配
    pub fn matches_name(&self, name: &str) -> bool {
        self.bean_name.is_empty() || self.bean_name == name
    }

    /// 类型是否匹配
    pub fn matches_type(&self, type_info: &TypeInfo) -> bool {
        type_info.matches(&self.type_name)
    }
}

impl fmt::Display for BeanSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collection {
            f.write_str("[]")?;
        } else if self.type_name.is_empty() {
            f.write_str(&self.bean_name)?;
        } else {
            write!(f, "{}:{}", self.type_name, self.bean_name)?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl FromStr for BeanSelector {
    type Err = DependencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 查找不属于 `::` 的单个冒号，取最后一个
fn find_separator(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (0..bytes.len()).rev().find(|&i| {
        bytes[i] == b':'
            && (i == 0 || bytes[i - 1] != b':')
            && bytes.get(i + 1) != Some(&b':')
    })
}
