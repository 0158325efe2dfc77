//! 扁平化属性存储
//!
//! 嵌套的配置值被展开为 `a.b.c`、`list[0]` 形式的键，键统一转为小写。
//! 空映射和空数组保存为空字符串，以便仍能判断键是否存在。

use crate::binder::{Bindable, Binder};
use crate::readers::ReaderRegistry;
use config_abstractions::{join_key, matching_brace, PropertySource};
use infrastructure_common::{cast, ConfigError, ConfigResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// 引用解析的最大嵌套深度
pub const MAX_RESOLVE_DEPTH: usize = 64;

/// 属性存储
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    data: BTreeMap<String, String>,
}

impl Properties {
    /// 创建空的属性存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 从嵌套值创建
    pub fn from_value(value: &Value) -> Self {
        let mut props = Self::new();
        props.set("", value.clone());
        props
    }

    /// 设置属性
    ///
    /// 映射和数组会被展开，同一个键再次设置时覆盖原有的整棵子树
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let key = key.trim().to_lowercase();
        let value = value.into();
        if !key.is_empty() {
            self.remove_tree(&key);
        }
        for (k, v) in flatten_with_prefix(&key, &value) {
            self.data.insert(k.to_lowercase(), v);
        }
    }

    /// 精确获取属性值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(&key.to_lowercase()).map(String::as_str)
    }

    /// 获取属性值，不存在时返回默认值
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// 键本身或其任一子键存在
    pub fn has(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        if key.is_empty() {
            return !self.data.is_empty();
        }
        let found = self.subtree(&key).next().is_some();
        found
    }

    /// 以给定前缀开头的全部属性
    ///
    /// 键等于前缀，或以 `前缀.` 或 `前缀[` 开头；数组元素 `key[i]` 也属于 `key` 的前缀范围
    pub fn prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        let prefix = prefix.to_lowercase();
        if prefix.is_empty() {
            return self.data.clone();
        }
        self.subtree(&prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 全部键，按字典序排列
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 合并另一个属性存储，逐键覆盖
    pub fn merge(&mut self, other: &Properties) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    /// 解析模板中的 `${key}` 和 `${key:=default}` 引用
    ///
    /// 属性值和默认值中的引用会继续解析，嵌套超过 [`MAX_RESOLVE_DEPTH`] 层视为错误
    pub fn resolve(&self, template: &str) -> ConfigResult<String> {
        self.resolve_depth(template, 0)
    }

    fn resolve_depth(&self, template: &str, depth: usize) -> ConfigResult<String> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(ConfigError::ResolveDepthExceeded {
                template: template.to_string(),
            });
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let body = &rest[start + 2..];
            let close = matching_brace(body).ok_or_else(|| ConfigError::InvalidTag {
                tag: template.to_string(),
                reason: "unclosed \"${\"".to_string(),
            })?;

            let inner = &body[..close];
            let (key, default) = split_default(inner);
            let value = match (self.get(key.trim()), default) {
                (Some(v), _) => self.resolve_depth(v, depth + 1)?,
                (None, Some(d)) => self.resolve_depth(d, depth + 1)?,
                (None, None) => {
                    return Err(ConfigError::PropertyNotFound {
                        key: key.trim().to_string(),
                    })
                }
            };
            out.push_str(&value);
            rest = &body[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// 使用给定读取器注册表加载配置文件
    pub fn load_with(&mut self, path: impl AsRef<Path>, readers: &ReaderRegistry) -> ConfigResult<()> {
        let value = readers.read_file(path.as_ref())?;
        self.apply(value);
        debug!("从 {} 加载了属性，当前共 {} 项", path.as_ref().display(), self.len());
        Ok(())
    }

    /// 加载配置文件，按扩展名选择内置读取器
    pub fn load(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        self.load_with(path, &ReaderRegistry::with_defaults())
    }

    /// 解析给定格式的内容
    pub fn read(&mut self, bytes: &[u8], ext: &str) -> ConfigResult<()> {
        let value = ReaderRegistry::with_defaults().read(bytes, ext)?;
        self.apply(value);
        Ok(())
    }

    /// 使用默认转换器把属性绑定到目标
    pub fn bind<T: Bindable>(&self, target: &mut T, tag: &str) -> ConfigResult<()> {
        Binder::new(self).bind(target, tag)
    }

    fn apply(&mut self, value: Value) {
        for (k, v) in flatten(&value) {
            self.data.insert(k.to_lowercase(), v);
        }
    }

    fn remove_tree(&mut self, key: &str) {
        let doomed: Vec<String> = self.subtree(key).map(|(k, _)| k.clone()).collect();
        for k in doomed {
            self.data.remove(&k);
        }
    }

    /// 键本身及其子键
    fn subtree<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        self.data
            .range::<str, _>((std::ops::Bound::Included(key), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(key))
            .filter(move |(k, _)| is_same_or_child(k, key))
    }
}

impl PropertySource for Properties {
    fn get(&self, key: &str) -> Option<&str> {
        Properties::get(self, key)
    }

    fn has(&self, key: &str) -> bool {
        Properties::has(self, key)
    }

    fn sub_keys(&self, key: &str) -> Vec<String> {
        let key = key.to_lowercase();
        let mut names = BTreeSet::new();
        for k in self.data.keys() {
            let rest = if key.is_empty() {
                k.as_str()
            } else {
                match k.strip_prefix(key.as_str()).and_then(|r| r.strip_prefix('.')) {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end > 0 {
                names.insert(rest[..end].to_string());
            }
        }
        names.into_iter().collect()
    }

    fn resolve(&self, template: &str) -> ConfigResult<String> {
        Properties::resolve(self, template)
    }
}

impl From<Value> for Properties {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

fn is_same_or_child(k: &str, key: &str) -> bool {
    k.len() == key.len() || matches!(k.as_bytes().get(key.len()), Some(b'.') | Some(b'['))
}

fn split_default(inner: &str) -> (&str, Option<&str>) {
    let bytes = inner.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'$', b'{') => {
                depth += 1;
                i += 2;
                continue;
            }
            (b'}', _) => depth = depth.saturating_sub(1),
            (b':', b'=') if depth == 0 => return (&inner[..i], Some(&inner[i + 2..])),
            _ => {}
        }
        i += 1;
    }
    (inner, None)
}

/// 将嵌套值展开为扁平的键值对
///
/// 映射使用 `.` 连接，数组使用 `[i]`，空映射和空数组展开为空字符串，
/// `null` 同样视为空字符串
pub fn flatten(value: &Value) -> BTreeMap<String, String> {
    flatten_with_prefix("", value)
}

fn flatten_with_prefix(prefix: &str, value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(prefix, value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) if map.is_empty() => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), String::new());
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&join_key(prefix, k), v, out);
            }
        }
        Value::Array(arr) if arr.is_empty() => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), String::new());
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                flatten_into(&format!("{prefix}[{i}]"), v, out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), cast::to_string(scalar));
        }
    }
}
