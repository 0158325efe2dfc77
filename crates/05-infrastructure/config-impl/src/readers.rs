//! 配置文件读取器实现
//!
//! 每种格式都解析为嵌套的 JSON 值，展开工作交给 [`crate::Properties`]。

use config_abstractions::PropertyReader;
use infrastructure_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// `.properties` 文件读取器
///
/// 支持 `#`、`!` 注释，`=` 或 `:` 分隔键值，行尾 `\` 续行
#[derive(Debug, Default)]
pub struct PropertiesReader;

impl PropertyReader for PropertiesReader {
    fn read(&self, bytes: &[u8]) -> ConfigResult<Value> {
        let content = std::str::from_utf8(bytes).map_err(ConfigError::parse_error)?;
        let mut map = Map::new();
        let mut pending = String::new();

        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            if let Some(head) = line.strip_suffix('\\') {
                pending.push_str(head);
                continue;
            }
            pending.push_str(line);
            let entry = std::mem::take(&mut pending);

            let Some(pos) = entry.find(|c| c == '=' || c == ':') else {
                return Err(ConfigError::parse_error(format!(
                    "line {}: missing separator in {entry:?}",
                    line_no + 1
                )));
            };
            let key = entry[..pos].trim();
            if key.is_empty() {
                return Err(ConfigError::parse_error(format!("line {}: empty key", line_no + 1)));
            }
            map.insert(key.to_string(), Value::String(entry[pos + 1..].trim().to_string()));
        }

        if !pending.is_empty() {
            warn!("properties 文件以续行符结尾，忽略未完成的行: {}", pending);
        }
        Ok(Value::Object(map))
    }

    fn name(&self) -> &str {
        "properties"
    }

    fn extensions(&self) -> &[&'static str] {
        &["properties"]
    }
}

/// YAML 文件读取器
#[derive(Debug, Default)]
pub struct YamlReader;

impl YamlReader {
    /// 将 YAML 值转换为 JSON 值，非字符串的映射键转为字符串
    fn yaml_to_json(value: &serde_yaml::Value) -> Value {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(i.into())
                } else if let Some(u) = n.as_u64() {
                    Value::Number(u.into())
                } else {
                    n.as_f64()
                        .and_then(serde_json::Number::from_f64)
                        .map_or(Value::Null, Value::Number)
                }
            }
            serde_yaml::Value::String(s) => Value::String(s.clone()),
            serde_yaml::Value::Sequence(seq) => Value::Array(seq.iter().map(Self::yaml_to_json).collect()),
            serde_yaml::Value::Mapping(mapping) => Value::Object(
                mapping
                    .iter()
                    .map(|(k, v)| (Self::yaml_key(k), Self::yaml_to_json(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Self::yaml_to_json(&tagged.value),
        }
    }

    fn yaml_key(key: &serde_yaml::Value) -> String {
        match key {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        }
    }
}

impl PropertyReader for YamlReader {
    fn read(&self, bytes: &[u8]) -> ConfigResult<Value> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }
        let value: serde_yaml::Value = serde_yaml::from_slice(bytes).map_err(ConfigError::parse_error)?;
        Ok(Self::yaml_to_json(&value))
    }

    fn name(&self) -> &str {
        "yaml"
    }

    fn extensions(&self) -> &[&'static str] {
        &["yaml", "yml"]
    }
}

/// TOML 文件读取器
#[derive(Debug, Default)]
pub struct TomlReader;

impl TomlReader {
    /// 将 TOML 值转换为 JSON 值
    fn toml_to_json(value: &toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s.clone()),
            toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
            toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            toml::Value::Boolean(b) => Value::Bool(*b),
            toml::Value::Array(arr) => Value::Array(arr.iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_to_json(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        }
    }
}

impl PropertyReader for TomlReader {
    fn read(&self, bytes: &[u8]) -> ConfigResult<Value> {
        let content = std::str::from_utf8(bytes).map_err(ConfigError::parse_error)?;
        let table: toml::Table = toml::from_str(content).map_err(ConfigError::parse_error)?;
        Ok(Self::toml_to_json(&toml::Value::Table(table)))
    }

    fn name(&self) -> &str {
        "toml"
    }

    fn extensions(&self) -> &[&'static str] {
        &["toml"]
    }
}

/// JSON 文件读取器
#[derive(Debug, Default)]
pub struct JsonReader;

impl PropertyReader for JsonReader {
    fn read(&self, bytes: &[u8]) -> ConfigResult<Value> {
        serde_json::from_slice(bytes).map_err(ConfigError::parse_error)
    }

    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }
}

/// 读取器注册表，按文件扩展名选择读取器
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn PropertyReader>>,
}

impl ReaderRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建包含内置读取器的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(PropertiesReader)
            .register(YamlReader)
            .register(TomlReader)
            .register(JsonReader);
        registry
    }

    /// 注册读取器，同一扩展名后注册者覆盖先注册者
    pub fn register<R: PropertyReader + 'static>(&mut self, reader: R) -> &mut Self {
        let reader: Arc<dyn PropertyReader> = Arc::new(reader);
        for ext in reader.extensions() {
            if self.readers.insert(ext.to_string(), Arc::clone(&reader)).is_some() {
                warn!("扩展名 {} 的读取器被 {} 覆盖", ext, reader.name());
            }
        }
        self
    }

    /// 按扩展名查找读取器
    pub fn get(&self, ext: &str) -> Option<&Arc<dyn PropertyReader>> {
        self.readers.get(&ext.to_ascii_lowercase())
    }

    /// 解析字节内容
    pub fn read(&self, bytes: &[u8], ext: &str) -> ConfigResult<Value> {
        let reader = self.get(ext).ok_or_else(|| ConfigError::UnknownReader {
            ext: ext.to_string(),
        })?;
        reader.read(bytes)
    }

    /// 读取并解析文件
    pub fn read_file(&self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = path.as_ref();
        debug!("加载配置文件: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let reader = self.get(ext).ok_or_else(|| ConfigError::UnknownReader {
            ext: ext.to_string(),
        })?;

        let bytes = std::fs::read(path)?;
        let value = reader.read(&bytes)?;
        debug!("配置文件 {} 由 {} 读取器加载完成", path.display(), reader.name());
        Ok(value)
    }
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut exts: Vec<_> = self.readers.keys().collect();
        exts.sort();
        f.debug_struct("ReaderRegistry").field("extensions", &exts).finish()
    }
}
