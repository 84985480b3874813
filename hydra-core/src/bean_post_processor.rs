//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后进行自定义处理的钩子，类似 Spring 的 BeanPostProcessor

use std::sync::Arc;

use crate::bean::BeanObject;
use crate::error::ContainerResult;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许替换 Bean 实例
///
/// 使用场景：
/// - AOP 代理创建
/// - Bean 包装
///
/// # 示例
///
/// ```ignore
/// use hydra_core::prelude::*;
///
/// pub struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: Arc<dyn BeanObject>,
///         bean_name: &str,
///     ) -> ContainerResult<Arc<dyn BeanObject>> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调之前调用
    fn post_process_before_initialization(
        &self,
        bean: Arc<dyn BeanObject>,
        _bean_name: &str,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        Ok(bean)
    }

    /// 在 Bean 初始化回调之后调用
    ///
    /// # 返回
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是代理）
    fn post_process_after_initialization(
        &self,
        bean: Arc<dyn BeanObject>,
        _bean_name: &str,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        Ok(bean)
    }

    /// 获取提前暴露的引用（用于解决循环依赖）
    ///
    /// 同一个 Bean 可能先经过这里，再经过 `post_process_after_initialization`，
    /// 两次返回的对象必须一致
    fn get_early_bean_reference(
        &self,
        bean: Arc<dyn BeanObject>,
        _bean_name: &str,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    fn order(&self) -> i32 {
        1000
    }
}
