//! Hydra AOP - 方法拦截与动态代理
//!
//! 提供：
//! - 切点表达式与 Advisor（切点 + 通知）模型
//! - 五种通知类型（Before、After、AfterReturning、AfterThrowing、Around）
//! - 接口代理与子类代理两种代理机制，以及自动选择策略
//! - 递归的通知链调用
//! - 通过 BeanPostProcessor 自动为匹配的 Bean 创建并缓存代理

pub mod advice;
pub mod advisor;
pub mod aspect;
pub mod bean_post_processor;
pub mod chain;
pub mod error;
pub mod error_info;
pub mod interface_proxy;
pub mod joinpoint;
pub mod pointcut;
pub mod properties;
pub mod proxy;
pub mod registry;
pub mod strategy;
pub mod subclass_proxy;

#[cfg(test)]
mod test_support;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceKind, AdviceType, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice,
    AroundAdvice, BeforeAdvice,
};
pub use advisor::Advisor;
pub use aspect::{
    get_all_aspect_registrations, Aspect, AspectBuilder, AspectRegistration,
    ExceptionLoggingAspect, LoggingAspect, PerformanceAspect,
};
pub use bean_post_processor::AopBeanPostProcessor;
pub use chain::{resolve_advices, AdviceChainInvocation, SuperMethod};
pub use error::{AopError, AopResult};
pub use error_info::ErrorInfo;
pub use interface_proxy::InterfaceAopProxy;
pub use joinpoint::{JoinPoint, ProceedingJoinPoint};
pub use pointcut::{wildcard_match, ArgsPredicate, MethodPredicate, Pointcut, PointcutExpression};
pub use properties::AopProperties;
pub use proxy::{AopProxy, InvocationHandler, ProxyDescriptor, ProxyFactory};
pub use registry::AdvisorRegistry;
pub use strategy::ProxyStrategySelector;
pub use subclass_proxy::{
    DispatchTableSubclassBuilder, SubclassAopProxy, SubclassBuilder, SubclassFactory,
};

// 导出 inventory 供切面注册使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::advisor::Advisor;
    pub use crate::aspect::{
        Aspect, AspectBuilder, AspectRegistration, ExceptionLoggingAspect, LoggingAspect,
        PerformanceAspect,
    };
    pub use crate::bean_post_processor::AopBeanPostProcessor;
    pub use crate::error::{AopError, AopResult};
    pub use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};
    pub use crate::pointcut::{Pointcut, PointcutExpression};
    pub use crate::properties::AopProperties;
    pub use crate::registry::AdvisorRegistry;
}
