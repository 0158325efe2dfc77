//! `#[derive(Bean)]` 实现

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::utils::{
    extract_string_from_field_attr, field_has_attribute, field_name, named_fields, validate_expr,
    value_tag,
};

/// 生成 `Wirable` 实现，字段按声明顺序处理
pub fn derive_bean_impl(input: &DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut steps = Vec::new();
    for field in named_fields(input, "Bean")? {
        let ident = &field.ident;
        let key = field_name(field);
        let expr = validate_expr(field)?;
        let value = value_tag(field)?;
        let selector = match extract_string_from_field_attr(field, "autowire")? {
            Some(s) => Some(s),
            None => extract_string_from_field_attr(field, "inject")?,
        };
        let nested = field_has_attribute(field, "nested");

        let used = [value.is_some(), selector.is_some(), nested];
        if used.iter().filter(|&&b| b).count() > 1 {
            return Err(syn::Error::new_spanned(
                field,
                "#[value]、#[autowire]/#[inject] 和 #[nested] 只能选择一个",
            ));
        }

        if let Some(tag) = value {
            let validate = match expr {
                Some(expr) => quote!(::core::option::Option::Some(#expr)),
                None => quote!(::core::option::Option::None),
            };
            steps.push(quote! {
                ctx.bind_field(&mut self.#ident, #key, #tag, #validate)?;
            });
        } else if let Some(selector) = selector {
            steps.push(quote! {
                ctx.autowire(&mut self.#ident, #key, #selector)?;
            });
        } else if nested {
            steps.push(quote! {
                ctx.wire_nested(&mut self.#ident, #key)?;
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::di_impl::Wirable for #name #ty_generics #where_clause {
            fn wire(
                &mut self,
                ctx: &mut ::di_impl::WireContext<'_>,
            ) -> ::di_impl::DependencyResult<()> {
                #(#steps)*
                let _ = ctx;
                ::core::result::Result::Ok(())
            }
        }
    })
}
