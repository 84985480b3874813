// hydra-core: 代理引擎的运行时类型模型与 Bean 元数据
//
// 提供：
// - 运行时类型描述（BeanClass / Method）与可分派对象（BeanObject）
// - Bean 定义、作用域与代理模式
// - BeanFactory 查询接口及内存实现
// - 配置与日志初始化

pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod scope;

// 重新导出常用类型
pub use bean::{
    arg_ref, value, Args, BeanClass, BeanClassBuilder, BeanDefinition, BeanObject,
    DependencyRef, DependencyTarget, InjectionPoint, InvocationResult, Method, ProxyMechanism,
    ProxyMode, ShellConstructor, TypeKind, TypeRef, Value,
};
pub use bean_factory::{BeanFactory, DefaultBeanFactory};
pub use bean_post_processor::BeanPostProcessor;
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use constants::*;
pub use error::{ContainerError, ContainerResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scope::Scope;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{
        arg_ref, value, Args, BeanClass, BeanDefinition, BeanObject, DependencyRef,
        InvocationResult, Method, ProxyMechanism, ProxyMode, TypeRef, Value,
    };
    pub use crate::bean_factory::{BeanFactory, DefaultBeanFactory};
    pub use crate::bean_post_processor::BeanPostProcessor;
    pub use crate::config::{ConfigValue, Environment, MapPropertySource, TomlPropertySource};
    pub use crate::error::{ContainerError, ContainerResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::scope::Scope;
    pub use anyhow::{anyhow, Context};
}
