//! 元数据定义
//!
//! 提供 bean 和绑定目标的类型信息

use std::any::TypeId;
use std::fmt;

/// 类型信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 完整类型名称（包含模块路径）
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（去掉各级模块路径，保留泛型参数）
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }

    /// 类型名称是否与给定名称匹配
    ///
    /// 完整名称和简短名称都可以匹配，空名称匹配任意类型
    pub fn matches(&self, name: &str) -> bool {
        name.is_empty() || name == self.name || name == self.short_name()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 去掉类型名称中的模块路径
///
/// `alloc::vec::Vec<my::Foo>` 变为 `Vec<Foo>`，`dyn my::Greeter` 变为 `dyn Greeter`
pub fn short_type_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut segment = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            result.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            result.push(ch);
        }
    }
    result.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    result
}
