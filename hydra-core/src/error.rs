use thiserror::Error;

use crate::bean::ProxyMode;

/// 统一的错误处理类型
///
/// 框架内部的胶水代码使用 anyhow::Result，通过 .context() 添加上下文。
/// 目标方法与通知抛出的错误同样以 anyhow::Error 传递，调用方可以 downcast 回原始类型。
pub use anyhow::Result;

/// 容器错误
///
/// 由 Bean 元数据存储、配置加载和日志初始化产生
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Bean not found: {0}")]
    BeanNotFound(String),

    #[error("Bean already exists: {0}")]
    BeanAlreadyExists(String),

    #[error("No method '{method}' on type '{class}'")]
    NoSuchMethod { class: String, method: String },

    #[error(
        "Conflicting proxy mode for bean '{bean}': definition declares {declared:?}, type declares {class_level:?}"
    )]
    ConflictingProxyMode {
        bean: String,
        declared: ProxyMode,
        class_level: ProxyMode,
    },

    #[error("Post processing failed for bean '{bean}': {source}")]
    PostProcessingFailed {
        bean: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;
