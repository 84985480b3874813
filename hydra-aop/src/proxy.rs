//! 代理抽象与代理工厂
//!
//! 两种后端共享同一个 `InvocationHandler`：它为每次调用解析匹配的通知，
//! 没有通知时直接调用真实方法，否则构建通知链执行

use hydra_core::{Args, BeanClass, BeanFactory, BeanObject, InvocationResult, Method, ProxyMechanism};
use std::fmt;
use std::sync::Arc;

use crate::advisor::Advisor;
use crate::chain::{resolve_advices, AdviceChainInvocation, SuperMethod};
use crate::error::AopResult;
use crate::interface_proxy::InterfaceAopProxy;
use crate::joinpoint::JoinPoint;
use crate::subclass_proxy::{SubclassAopProxy, SubclassBuilder};

/// 代理
pub trait AopProxy: Send + Sync {
    /// 使用创建代理时的容器生成代理对象
    fn get_proxy(&self) -> AopResult<Arc<dyn BeanObject>>;

    /// 使用指定容器解析壳实例的构造依赖
    fn get_proxy_with(&self, bean_factory: &dyn BeanFactory) -> AopResult<Arc<dyn BeanObject>>;

    fn is_proxyable(&self) -> bool {
        true
    }

    fn mechanism(&self) -> ProxyMechanism;
}

/// 一个 Bean 的代理描述，创建时计算一次
#[derive(Clone)]
pub struct ProxyDescriptor {
    pub bean_name: String,
    pub target: Arc<dyn BeanObject>,
    /// 目标的用户类型（跳过框架生成的子类）
    pub target_class: Arc<BeanClass>,
    /// 类型级匹配并已按 order 稳定排序的通知器
    pub advisors: Vec<Advisor>,
    pub supports_nested_invocation: bool,
    pub mechanism: ProxyMechanism,
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("bean_name", &self.bean_name)
            .field("target_class", &self.target_class.name())
            .field("advisors", &self.advisors.len())
            .field("supports_nested_invocation", &self.supports_nested_invocation)
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

/// 代理方法调用的统一入口
pub struct InvocationHandler {
    descriptor: ProxyDescriptor,
    bean_factory: Arc<dyn BeanFactory>,
}

impl InvocationHandler {
    pub fn new(descriptor: ProxyDescriptor, bean_factory: Arc<dyn BeanFactory>) -> Self {
        Self {
            descriptor,
            bean_factory,
        }
    }

    pub fn descriptor(&self) -> &ProxyDescriptor {
        &self.descriptor
    }

    /// 拦截一次调用
    ///
    /// `super_method` 仅在子类代理支持嵌套调用时提供，此时真实方法在壳实例上以代理为 `this` 执行
    pub fn invoke(
        &self,
        proxy: &dyn BeanObject,
        method: &Method,
        args: Args,
        super_method: Option<SuperMethod<'_>>,
    ) -> InvocationResult {
        let descriptor = &self.descriptor;
        let advices = resolve_advices(&descriptor.target_class, method, &args, &descriptor.advisors);

        if advices.is_empty() {
            tracing::trace!("No advice for {}, invoking directly", method.signature());
            return match super_method {
                Some(super_method) => super_method.invoke_super(proxy, method, args),
                None => descriptor
                    .target
                    .dispatch(descriptor.target.as_ref(), method, args),
            };
        }

        tracing::trace!(
            "🔷 [AOP] {} advice(s) for {} on bean '{}'",
            advices.len(),
            method.signature(),
            descriptor.bean_name
        );
        let join_point = JoinPoint::new(
            &descriptor.bean_name,
            Arc::clone(&descriptor.target),
            proxy,
            method,
            args,
            self.bean_factory.as_ref(),
        );
        AdviceChainInvocation::new(join_point, advices, super_method).proceed()
    }
}

/// 代理工厂，按描述中的代理机制选择后端
pub struct ProxyFactory;

impl ProxyFactory {
    pub fn create_aop_proxy(
        descriptor: ProxyDescriptor,
        bean_factory: Arc<dyn BeanFactory>,
        subclass_builder: &dyn SubclassBuilder,
    ) -> AopResult<Box<dyn AopProxy>> {
        tracing::debug!(
            "Creating {:?} proxy for bean '{}' ({} advisor(s))",
            descriptor.mechanism,
            descriptor.bean_name,
            descriptor.advisors.len()
        );
        match descriptor.mechanism {
            ProxyMechanism::Interfaces => {
                Ok(Box::new(InterfaceAopProxy::new(descriptor, bean_factory)?))
            }
            ProxyMechanism::Subclass => Ok(Box::new(SubclassAopProxy::new(
                descriptor,
                bean_factory,
                subclass_builder,
            )?)),
        }
    }
}
