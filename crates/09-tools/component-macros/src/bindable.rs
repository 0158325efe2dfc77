//! `#[derive(Bindable)]` 实现

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::utils::{field_has_attribute, field_name, named_fields, validate_expr, value_tag};

/// 生成 `Bindable` 实现
///
/// - `#[value("${key}")]` 绑定字段，`#[expr("...")]` 追加校验
/// - `#[embed]` 沿用父级键前缀绑定，与 `#[value]` 一起使用时按标签嵌套
/// - 没有属性的字段保持原值
pub fn derive_bindable_impl(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut binds = Vec::new();
    for field in named_fields(input, "Bindable")? {
        let ident = &field.ident;
        let key = field_name(field);
        let expr = validate_expr(field)?;

        match value_tag(field)? {
            Some(tag) => {
                let validate = match expr {
                    Some(expr) => quote!(::core::option::Option::Some(#expr)),
                    None => quote!(::core::option::Option::None),
                };
                binds.push(quote! {
                    binder.bind_field(&mut self.#ident, param, #key, #tag, #validate)?;
                });
            }
            None if field_has_attribute(field, "embed") => {
                binds.push(quote! {
                    binder.bind_embedded(&mut self.#ident, param, #key)?;
                });
            }
            None => {}
        }
    }

    Ok(quote! {
        impl #impl_generics ::config_impl::Bindable for #name #ty_generics #where_clause {
            fn bind_kind() -> ::config_impl::BindKind {
                ::config_impl::BindKind::Struct
            }

            fn bind_from(
                &mut self,
                binder: &::config_impl::Binder<'_>,
                param: &::config_impl::BindParam,
            ) -> ::config_impl::ConfigResult<()> {
                binder.check_struct(param)?;
                #(#binds)*
                ::core::result::Result::Ok(())
            }
        }
    })
}
