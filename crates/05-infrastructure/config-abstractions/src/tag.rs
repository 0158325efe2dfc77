//! 绑定标签解析
//!
//! 标签语法：`${key}`、`${key:=default}`，后面可以跟 `||splitter`
//! 指定切片绑定时使用的拆分器。默认值中允许嵌套 `${...}` 引用。

use infrastructure_common::{ConfigError, ConfigResult};
use std::fmt;

/// 解析后的绑定标签
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindTag {
    /// 属性键（相对键，可以为空）
    pub key: String,
    /// 默认值，`None` 表示未设置默认值
    pub default: Option<String>,
    /// 拆分器名称
    pub splitter: Option<String>,
}

impl BindTag {
    /// 解析标签字符串
    pub fn parse(tag: &str) -> ConfigResult<Self> {
        let invalid = |reason: &str| ConfigError::InvalidTag {
            tag: tag.to_string(),
            reason: reason.to_string(),
        };

        let s = tag.trim();
        let body = s
            .strip_prefix("${")
            .ok_or_else(|| invalid("tag should start with \"${\""))?;

        let close = matching_brace(body).ok_or_else(|| invalid("unclosed \"${\""))?;
        let inner = &body[..close];
        let rest = body[close + 1..].trim();

        let splitter = if rest.is_empty() {
            None
        } else {
            let name = rest
                .strip_prefix("||")
                .ok_or_else(|| invalid("unexpected text after \"}\""))?
                .trim();
            if name.is_empty() {
                return Err(invalid("empty splitter name"));
            }
            Some(name.to_string())
        };

        let (key, default) = match find_top_level(inner, ":=") {
            Some(pos) => (&inner[..pos], Some(inner[pos + 2..].to_string())),
            None => (inner, None),
        };

        let key = key.trim();
        if key.contains("${") || key.contains('}') {
            return Err(invalid("key can't contain a reference"));
        }

        Ok(Self {
            key: key.to_string(),
            default,
            splitter,
        })
    }

    /// 是否设置了默认值（包括空默认值）
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// 是否设置了非空默认值
    pub fn has_non_empty_default(&self) -> bool {
        self.default.as_deref().map_or(false, |d| !d.is_empty())
    }
}

impl fmt::Display for BindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}", self.key)?;
        if let Some(default) = &self.default {
            write!(f, ":={default}")?;
        }
        f.write_str("}")?;
        if let Some(splitter) = &self.splitter {
            write!(f, "||{splitter}")?;
        }
        Ok(())
    }
}

/// 查找与开头 `${` 匹配的 `}` 位置
pub fn matching_brace(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// 查找不在嵌套引用中的分隔符
fn find_top_level(s: &str, pat: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && s[i..].starts_with(pat) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// 一次绑定操作的参数
///
/// `key` 是完整的属性键，`path` 是面向用户的字段路径，只用于错误信息
#[derive(Debug, Clone, Default)]
pub struct BindParam {
    /// 完整属性键
    pub key: String,
    /// 字段路径
    pub path: String,
    /// 标签
    pub tag: BindTag,
    /// 校验表达式
    pub validate: Option<String>,
}

impl BindParam {
    /// 从根标签创建绑定参数
    pub fn root(tag: &str, path: impl Into<String>) -> ConfigResult<Self> {
        let tag = BindTag::parse(tag)?;
        Ok(Self {
            key: tag.key.clone(),
            path: path.into(),
            tag,
            validate: None,
        })
    }

    /// 为结构体字段创建子参数，字段标签的键拼接在当前键之后
    pub fn field(&self, field: &str, tag: &str) -> ConfigResult<Self> {
        let tag = BindTag::parse(tag)?;
        Ok(Self {
            key: join_key(&self.key, &tag.key),
            path: join_path(&self.path, field),
            tag,
            validate: None,
        })
    }

    /// 嵌入字段：沿用当前键，不继承默认值
    pub fn embed(&self, field: &str) -> Self {
        Self {
            key: self.key.clone(),
            path: join_path(&self.path, field),
            tag: BindTag {
                key: self.tag.key.clone(),
                default: None,
                splitter: None,
            },
            validate: None,
        }
    }

    /// 切片元素
    pub fn index(&self, i: usize) -> Self {
        Self {
            key: format!("{}[{i}]", self.key),
            path: format!("{}[{i}]", self.path),
            tag: BindTag {
                key: format!("{}[{i}]", self.tag.key),
                default: None,
                splitter: None,
            },
            validate: None,
        }
    }

    /// 映射条目
    pub fn entry(&self, name: &str) -> Self {
        Self {
            key: join_key(&self.key, name),
            path: format!("{}[{name}]", self.path),
            tag: BindTag {
                key: join_key(&self.tag.key, name),
                default: None,
                splitter: None,
            },
            validate: None,
        }
    }

    /// 设置校验表达式
    pub fn with_validate(mut self, expr: Option<&str>) -> Self {
        self.validate = expr.map(str::to_string);
        self
    }
}

/// 拼接属性键
pub fn join_key(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}
