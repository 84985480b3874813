use thiserror::Error;

/// AOP 装配与代理创建阶段的错误
///
/// 方法调用期间的错误（目标方法或通知抛出）不会被包装成这里的类型，
/// 而是原样以 `anyhow::Error` 返回给调用方
#[derive(Debug, Error)]
pub enum AopError {
    #[error("Advisor registry is sealed, cannot register '{0}'")]
    RegistrySealed(String),

    #[error("Invalid pointcut expression '{expression}': {reason}")]
    InvalidPointcut { expression: String, reason: String },

    #[error("Invalid advice '{advice}': {reason}")]
    InvalidAdvice { advice: String, reason: String },

    #[error("Cannot subclass final type '{0}'")]
    FinalClass(String),

    #[error("Cannot instantiate proxy shell for '{class}': {reason}")]
    NotInstantiable { class: String, reason: String },

    #[error("Type '{0}' implements no interfaces, interface proxy is not possible")]
    NoInterfaces(String),

    #[error("Method '{method}' is not exposed by proxy '{proxy}'")]
    MethodNotExposed { proxy: String, method: String },
}

pub type AopResult<T> = std::result::Result<T, AopError>;
