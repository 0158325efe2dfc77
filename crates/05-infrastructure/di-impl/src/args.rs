//! 构造函数参数注入
//!
//! 构造函数和方法 bean 的每个参数按声明顺序对应一个标签：
//! bean 参数使用选择器（空标签表示按类型查找），属性参数使用 `${...}`。

use crate::wiring::WireContext;
use chrono::{DateTime, Utc};
use config_impl::Bindable;
use di_abstractions::BeanSelector;
use infrastructure_common::{DependencyError, DependencyResult};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

/// 可作为构造函数参数的类型
pub trait ArgValue: Sized + 'static {
    /// 按标签取得参数值
    fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> ArgValue for Arc<T> {
    fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self> {
        let selector = BeanSelector {
            nullable: false,
            ..BeanSelector::parse(tag)?
        };
        ctx.get_bean::<T>(&selector)?
            .ok_or_else(|| DependencyError::BeanNotFound {
                selector: crate::wiring::describe::<T>(&selector),
            })
    }
}

impl<T: ?Sized + Send + Sync + 'static> ArgValue for Option<Arc<T>> {
    fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self> {
        let selector = BeanSelector::parse(tag)?.nullable();
        ctx.get_bean::<T>(&selector)
    }
}

impl<T: ?Sized + Send + Sync + 'static> ArgValue for Vec<Arc<T>> {
    fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self> {
        use crate::wiring::Injectable;

        let selector = BeanSelector::parse(tag)?;
        let mut beans = Vec::new();
        beans.inject(ctx, &selector)?;
        Ok(beans)
    }
}

/// 通过属性绑定得到的参数
///
/// ```ignore
/// container.register_bean_fn(
///     |servers: Prop<Vec<ServerConfig>>| Registry::new(servers.into_inner()),
///     &["${servers}"],
/// )?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prop<T>(pub T);

impl<T> Prop<T> {
    /// 取出内部值
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Prop<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Prop<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Bindable + Default> ArgValue for Prop<T> {
    fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self> {
        let mut value = T::default();
        ctx.bind(&mut value, tag)?;
        Ok(Prop(value))
    }
}

macro_rules! impl_scalar_arg {
    ($($t:ty),* $(,)?) => {
        $(
            impl ArgValue for $t {
                fn resolve(ctx: &mut WireContext<'_>, tag: &str) -> DependencyResult<Self> {
                    Prop::<$t>::resolve(ctx, tag).map(Prop::into_inner)
                }
            }
        )*
    };
}

impl_scalar_arg!(
    u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool, String, Duration,
    DateTime<Utc>,
);

/// 可注册为 bean 的函数，`Args` 为参数元组
pub trait Constructor<Args>: 'static {
    /// 返回值类型
    type Output;

    /// 参数个数
    fn arity(&self) -> usize;

    /// 解析参数并调用
    fn invoke(&self, ctx: &mut WireContext<'_>, tags: &[String]) -> DependencyResult<Self::Output>;
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Constructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + 'static,
            $($arg: ArgValue,)*
        {
            type Output = Out;

            fn arity(&self) -> usize {
                <[&str]>::len(&[$(stringify!($arg)),*])
            }

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn invoke(&self, ctx: &mut WireContext<'_>, tags: &[String]) -> DependencyResult<Out> {
                let mut tags = tags.iter().map(String::as_str);
                $(
                    let $arg = <$arg as ArgValue>::resolve(ctx, tags.next().unwrap_or(""))?;
                )*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
