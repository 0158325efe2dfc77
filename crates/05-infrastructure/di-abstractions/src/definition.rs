//! bean 定义的状态与元数据

use infrastructure_common::TypeInfo;
use std::fmt;

/// bean 状态
///
/// `Default -> Resolving -> Resolved -> Wiring -> Wired`，条件或 profile
/// 不满足的 bean 进入 `Deleted`，之后任何查询都不会再返回它
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeanStatus {
    /// 刚注册
    #[default]
    Default,
    /// 正在求值条件
    Resolving,
    /// 条件满足，等待装配
    Resolved,
    /// 正在装配
    Wiring,
    /// 装配完成
    Wired,
    /// 已删除
    Deleted,
}

impl fmt::Display for BeanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Default => "default",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::Wiring => "wiring",
            Self::Wired => "wired",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// bean 种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanKind {
    /// 预先创建的实例
    Object,
    /// 构造函数
    Constructor,
    /// 以父 bean 为接收者的方法
    Method,
}

impl fmt::Display for BeanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Object => "object",
            Self::Constructor => "constructor",
            Self::Method => "method",
        };
        f.write_str(s)
    }
}

/// bean 的只读描述，用于条件求值和查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanInfo {
    /// bean 名称
    pub name: String,
    /// bean 自身类型
    pub type_info: TypeInfo,
    /// 导出的其他类型
    pub exports: Vec<TypeInfo>,
    /// 描述，形如 `name@file:line`
    pub description: String,
    /// 种类
    pub kind: BeanKind,
    /// 是否为首选 bean
    pub primary: bool,
    /// 当前状态
    pub status: BeanStatus,
}

impl BeanInfo {
    /// 自身类型或任一导出类型满足条件
    pub fn any_type(&self, mut pred: impl FnMut(&TypeInfo) -> bool) -> bool {
        pred(&self.type_info) || self.exports.iter().any(pred)
    }
}

impl fmt::Display for BeanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
