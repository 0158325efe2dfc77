//! 宏工具函数

use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, Meta, Result};

/// 取出结构体的命名字段
pub fn named_fields<'a>(input: &'a DeriveInput, macro_name: &str) -> Result<Vec<&'a Field>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            Fields::Unit => Ok(Vec::new()),
            Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                &input.ident,
                format!("{macro_name} 只支持命名字段的结构体"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{macro_name} 只能用于结构体"),
        )),
    }
}

/// 查找字段上的属性
pub fn find_attribute<'a>(field: &'a Field, attr_name: &str) -> Option<&'a Attribute> {
    field.attrs.iter().find(|attr| attr.path().is_ident(attr_name))
}

/// 检查字段是否有特定属性
pub fn field_has_attribute(field: &Field, attr_name: &str) -> bool {
    find_attribute(field, attr_name).is_some()
}

/// 取出 `#[name("...")]` 中的字符串，`#[name]` 返回空字符串
pub fn attribute_string(attr: &Attribute) -> Result<String> {
    match &attr.meta {
        Meta::Path(_) => Ok(String::new()),
        Meta::List(_) => Ok(attr.parse_args::<LitStr>()?.value()),
        Meta::NameValue(nv) => Err(syn::Error::new_spanned(
            nv,
            "请使用 #[name(\"...\")] 形式",
        )),
    }
}

/// 从字段属性中提取字符串值，属性不存在时返回 `None`
pub fn extract_string_from_field_attr(field: &Field, attr_name: &str) -> Result<Option<String>> {
    find_attribute(field, attr_name).map(attribute_string).transpose()
}

/// 提取 `#[value]` 标签并做基本的格式检查
pub fn value_tag(field: &Field) -> Result<Option<String>> {
    let Some(attr) = find_attribute(field, "value") else {
        return Ok(None);
    };
    let tag = attribute_string(attr)?;
    if !tag.trim_start().starts_with("${") {
        return Err(syn::Error::new_spanned(
            attr,
            format!("绑定标签 \"{tag}\" 必须以 \"${{\" 开头"),
        ));
    }
    Ok(Some(tag))
}

/// 提取 `#[expr]` 校验表达式，必须与 `#[value]` 一起使用
pub fn validate_expr(field: &Field) -> Result<Option<String>> {
    let expr = extract_string_from_field_attr(field, "expr")?;
    if expr.is_some() && !field_has_attribute(field, "value") {
        return Err(syn::Error::new_spanned(
            field,
            "#[expr] 需要与 #[value] 一起使用",
        ));
    }
    Ok(expr)
}

/// 字段名
pub fn field_name(field: &Field) -> String {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
        .unwrap_or_default()
}
