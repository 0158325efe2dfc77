//! 通用类型转换工具
//!
//! 所有转换函数分两级：
//!
//! - `to_xxx_e` 严格版本，失败时返回 [`CastError`]
//! - `to_xxx` 宽松版本，失败时返回零值，永不 panic
//!
//! 输入统一为 [`serde_json::Value`]，字符串会被解析，数字和布尔值互相转换。

use crate::errors::{CastError, CastResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$").expect("duration regex")
});

static DURATION_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").expect("duration part regex")
});

/// 时间字符串依次尝试的格式
const TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// 值的类型名称，用于错误信息
fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn cast_error(v: &Value, to: &'static str) -> CastError {
    let value = match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    CastError::new(value, kind_of(v), to)
}

/// 解析布尔字符串，接受的写法与常见配置约定一致
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// 转换为布尔值
pub fn to_bool_e(v: &Value) -> CastResult<bool> {
    match v {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |f| f != 0.0)),
        Value::String(s) => parse_bool(s.trim()).ok_or_else(|| cast_error(v, "bool")),
        _ => Err(cast_error(v, "bool")),
    }
}

/// 转换为有符号整数
pub fn to_i64_e(v: &Value) -> CastResult<i64> {
    match v {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| cast_error(v, "i64")),
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                return i64::from_str_radix(hex, 16).map_err(|_| cast_error(v, "i64"));
            }
            s.parse::<i64>().map_err(|_| cast_error(v, "i64"))
        }
        _ => Err(cast_error(v, "i64")),
    }
}

/// 转换为无符号整数，负数视为失败
pub fn to_u64_e(v: &Value) -> CastResult<u64> {
    match v {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(u64::from(*b)),
        Value::Number(n) => match n.as_u64() {
            Some(u) => Ok(u),
            None => match n.as_f64() {
                Some(f) if f >= 0.0 => Ok(f as u64),
                _ => Err(cast_error(v, "u64")),
            },
        },
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                return u64::from_str_radix(hex, 16).map_err(|_| cast_error(v, "u64"));
            }
            s.parse::<u64>().map_err(|_| cast_error(v, "u64"))
        }
        _ => Err(cast_error(v, "u64")),
    }
}

/// 转换为浮点数
pub fn to_f64_e(v: &Value) -> CastResult<f64> {
    match v {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| cast_error(v, "f64")),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| cast_error(v, "f64")),
        _ => Err(cast_error(v, "f64")),
    }
}

/// 转换为字符串，数组和对象不能转换
pub fn to_string_e(v: &Value) -> CastResult<String> {
    match v {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(cast_error(v, "string")),
    }
}

/// 转换为时长
///
/// 字符串支持 `ns|us|ms|s|m|h` 单位及其组合（如 `1h30m`），
/// 纯整数（字符串或数字）按纳秒处理
pub fn to_duration_e(v: &Value) -> CastResult<Duration> {
    match v {
        Value::Null => Ok(Duration::ZERO),
        Value::Number(_) => to_u64_e(v)
            .map(Duration::from_nanos)
            .map_err(|_| cast_error(v, "duration")),
        Value::String(s) => parse_duration(s).map_err(|_| cast_error(v, "duration")),
        _ => Err(cast_error(v, "duration")),
    }
}

/// 解析时长字符串
pub fn parse_duration(s: &str) -> CastResult<Duration> {
    let s = s.trim();
    let err = || CastError::new(s, "string", "duration");
    if s.is_empty() {
        return Err(err());
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<u64>().map(Duration::from_nanos).map_err(|_| err());
    }
    if !DURATION_RE.is_match(s) {
        return Err(err());
    }

    let mut nanos = 0f64;
    for cap in DURATION_PART_RE.captures_iter(s) {
        let number: f64 = cap[1].parse().map_err(|_| err())?;
        let unit = match &cap[2] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            _ => 3600.0 * 1e9,
        };
        nanos += number * unit;
    }
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(err());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// 转换为 UTC 时间
///
/// 字符串依次尝试 RFC 3339、若干常用日期时间格式和纯日期格式，
/// 纯整数按 unix 秒处理
pub fn to_time_e(v: &Value) -> CastResult<DateTime<Utc>> {
    match v {
        Value::Number(_) => {
            let secs = to_i64_e(v).map_err(|_| cast_error(v, "time"))?;
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| cast_error(v, "time"))
        }
        Value::String(s) => parse_time(s).map_err(|_| cast_error(v, "time")),
        _ => Err(cast_error(v, "time")),
    }
}

/// 解析时间字符串
pub fn parse_time(s: &str) -> CastResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    for layout in TIME_LAYOUTS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
            return Ok(t.and_utc());
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            if let Some(t) = d.and_hms_opt(0, 0, 0) {
                return Ok(t.and_utc());
            }
        }
    }
    if let Ok(secs) = s.parse::<i64>() {
        if let Some(t) = DateTime::<Utc>::from_timestamp(secs, 0) {
            return Ok(t);
        }
    }
    Err(CastError::new(s, "string", "time"))
}

/// 转换为布尔值，失败返回 `false`
pub fn to_bool(v: &Value) -> bool {
    to_bool_e(v).unwrap_or_default()
}

/// 转换为有符号整数，失败返回 0
pub fn to_i64(v: &Value) -> i64 {
    to_i64_e(v).unwrap_or_default()
}

/// 转换为无符号整数，失败返回 0
pub fn to_u64(v: &Value) -> u64 {
    to_u64_e(v).unwrap_or_default()
}

/// 转换为浮点数，失败返回 0.0
pub fn to_f64(v: &Value) -> f64 {
    to_f64_e(v).unwrap_or_default()
}

/// 转换为字符串，失败返回空串
pub fn to_string(v: &Value) -> String {
    to_string_e(v).unwrap_or_default()
}

/// 转换为时长，失败返回零时长
pub fn to_duration(v: &Value) -> Duration {
    to_duration_e(v).unwrap_or_default()
}

/// 转换为时间，失败返回 unix 零点
pub fn to_time(v: &Value) -> DateTime<Utc> {
    to_time_e(v).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
