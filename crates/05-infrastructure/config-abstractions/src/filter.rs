//! 绑定过滤器抽象接口

use crate::tag::BindParam;
use infrastructure_common::ConfigResult;
use std::any::Any;

/// 绑定过滤器 trait
///
/// 在默认的标量绑定之前调用。返回 `Ok(true)` 表示过滤器已经处理了该字段，
/// 绑定器跳过默认逻辑；返回错误则中止整个绑定过程。
pub trait BindFilter {
    /// 处理字段
    fn filter(&self, target: &mut dyn Any, param: &BindParam) -> ConfigResult<bool>;
}

impl<F> BindFilter for F
where
    F: Fn(&mut dyn Any, &BindParam) -> ConfigResult<bool>,
{
    fn filter(&self, target: &mut dyn Any, param: &BindParam) -> ConfigResult<bool> {
        self(target, param)
    }
}
