//! 错误类型定义

use thiserror::Error;

/// 类型转换错误
///
/// `cast` 模块中严格版本（`_e` 后缀）函数返回的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to cast {value:?} of type {from} to {to}")]
pub struct CastError {
    /// 原始值的字符串形式
    pub value: String,
    /// 原始值类型
    pub from: &'static str,
    /// 目标类型
    pub to: &'static str,
}

impl CastError {
    /// 创建新的类型转换错误
    pub fn new(value: impl Into<String>, from: &'static str, to: &'static str) -> Self {
        Self {
            value: value.into(),
            from,
            to,
        }
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("read config file error: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("parse config error: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unsupported file type \"{ext}\"")]
    UnknownReader { ext: String },

    #[error("property \"{key}\" not found")]
    PropertyNotFound { key: String },

    #[error("property \"{key}\" not config")]
    PropertyNotConfig { key: String },

    #[error("resolve \"{template}\" exceeds max depth")]
    ResolveDepthExceeded { template: String },

    #[error("parse tag \"{tag}\" error: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("{kind} can't have a non-empty default value")]
    DefaultNotAllowed { kind: &'static str },

    #[error("{message}")]
    Unsupported { message: String },

    #[error("unknown splitter \"{name}\"")]
    UnknownSplitter { name: String },

    #[error("convert to {type_name} error: {message}")]
    Converter { type_name: String, message: String },

    #[error("invalid expression \"{expr}\": {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("validate failed on \"{expr}\" for value {value}")]
    ValidationFailed { expr: String, value: String },

    #[error("bind {path} error: {source}")]
    Bind {
        path: String,
        source: Box<ConfigError>,
    },

    #[error(transparent)]
    Cast(#[from] CastError),
}

impl ConfigError {
    /// 创建解析错误
    pub fn parse_error(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ParseError {
            source: source.into(),
        }
    }

    /// 创建不支持的绑定类型错误
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// 为错误附加字段路径
    ///
    /// 已经带有路径的错误不再重复包装，保证报错只出现最内层的字段路径
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            err @ Self::Bind { .. } => err,
            err => Self::Bind {
                path: path.into(),
                source: Box::new(err),
            },
        }
    }

    /// 去掉路径包装后的原始错误
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Bind { source, .. } => source.root_cause(),
            err => err,
        }
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("bean already registered: {bean}")]
    AlreadyRegistered { bean: String },

    #[error("bean registration is closed after auto_wire_beans: {bean}")]
    RegistrationClosed { bean: String },

    #[error("condition already set")]
    ConditionAlreadySet,

    #[error("can't find bean, bean: \"{selector}\"")]
    BeanNotFound { selector: String },

    #[error("\"{selector}\" found {count} beans: [{descriptions}]")]
    AmbiguousBeans {
        selector: String,
        count: usize,
        descriptions: String,
    },

    #[error("\"{selector}\" found {count} primary beans: [{descriptions}]")]
    MultiplePrimary {
        selector: String,
        count: usize,
        descriptions: String,
    },

    #[error("found circular autowire: {path}")]
    CircularDependency { path: String },

    #[error("bean {bean} has been deleted")]
    BeanDeleted { bean: String },

    #[error("invalid bean selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("{message}")]
    Unsupported { message: String },

    #[error("bean {bean} can't be used as {expected}")]
    TypeMismatch { bean: String, expected: String },

    #[error("create bean {bean} error: {source}")]
    ConstructorFailed {
        bean: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("wire field {field} error: {source}")]
    Field {
        field: String,
        source: Box<DependencyError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DependencyError {
    /// 为错误附加字段名
    pub fn with_field(self, field: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// 去掉字段包装后的原始错误
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Field { source, .. } => source.root_cause(),
            err => err,
        }
    }
}

/// 结果类型别名
pub type CastResult<T> = Result<T, CastError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
