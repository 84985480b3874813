//! 子类代理
//!
//! Rust 不能在运行时生成子类，这里用"分派表"模拟：生成的代理类型继承用户类型，
//! 可重写的方法路由到 `InvocationHandler`，不可重写的方法直接在壳实例上执行。
//! 壳实例是父类部分，由类型上注册的构造函数创建，创建后从目标复制状态；
//! 提前暴露引用时的目标与最终初始化完成的实例不同，初始化后需要再复制一次。

use hydra_core::{
    Args, BeanClass, BeanFactory, BeanObject, InvocationResult, Method, ProxyMechanism,
};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

use crate::chain::SuperMethod;
use crate::error::{AopError, AopResult};
use crate::proxy::{AopProxy, InvocationHandler, ProxyDescriptor};

/// 运行时子类生成
pub trait SubclassBuilder: Send + Sync {
    /// 为目标类型生成子类，返回可以创建实例的工厂
    fn build(&self, target_class: &Arc<BeanClass>) -> AopResult<SubclassFactory>;
}

/// 默认的分派表实现
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchTableSubclassBuilder;

impl SubclassBuilder for DispatchTableSubclassBuilder {
    fn build(&self, target_class: &Arc<BeanClass>) -> AopResult<SubclassFactory> {
        let base = target_class.user_class();

        // 目标本身是接口代理时没有可继承的具体类型，只保留接口
        if base.proxy_origin() == Some(ProxyMechanism::Interfaces) {
            let mut builder = BeanClass::builder(format!("{}$$HydraProxy", base.name()))
                .proxy_origin(ProxyMechanism::Subclass);
            for interface in base.all_interfaces() {
                builder = builder.implements(interface);
            }
            for method in base.all_methods() {
                builder = builder.with_method(method);
            }
            return Ok(SubclassFactory {
                proxy_class: builder.build(),
                base,
                has_shell: false,
            });
        }

        if base.is_final() {
            return Err(AopError::FinalClass(base.name().to_string()));
        }

        let mut builder = BeanClass::builder(format!("{}$$HydraProxy", base.name()))
            .extends(Arc::clone(&base))
            .proxy_origin(ProxyMechanism::Subclass);
        for method in base.all_methods().into_iter().filter(Method::is_overridable) {
            builder = builder.with_method(method);
        }

        tracing::trace!("Generated subclass '{}$$HydraProxy'", base.name());
        Ok(SubclassFactory {
            proxy_class: builder.build(),
            base,
            has_shell: true,
        })
    }
}

/// 生成的子类及其实例化方式
pub struct SubclassFactory {
    proxy_class: Arc<BeanClass>,
    base: Arc<BeanClass>,
    has_shell: bool,
}

impl SubclassFactory {
    pub fn proxy_class(&self) -> &Arc<BeanClass> {
        &self.proxy_class
    }

    pub fn base_class(&self) -> &Arc<BeanClass> {
        &self.base
    }

    /// 创建代理实例：构造壳实例并从目标复制状态
    pub fn new_instance(
        &self,
        bean_factory: &dyn BeanFactory,
        handler: Arc<InvocationHandler>,
    ) -> AopResult<Arc<dyn BeanObject>> {
        let shell = if self.has_shell {
            Some(RwLock::new(
                self.construct_shell(bean_factory, handler.descriptor().target.as_ref())?,
            ))
        } else {
            None
        };

        Ok(Arc::new(SubclassProxyObject {
            class: Arc::clone(&self.proxy_class),
            nested: handler.descriptor().supports_nested_invocation,
            shell,
            handler,
        }))
    }

    fn construct_shell(
        &self,
        bean_factory: &dyn BeanFactory,
        state_source: &dyn BeanObject,
    ) -> AopResult<Box<dyn BeanObject>> {
        let constructor = self.base.constructor().ok_or_else(|| AopError::NotInstantiable {
            class: self.base.name().to_string(),
            reason: "no constructor registered".to_string(),
        })?;

        let mut shell = constructor(bean_factory).map_err(|e| AopError::NotInstantiable {
            class: self.base.name().to_string(),
            reason: format!("{:#}", e),
        })?;
        shell.transfer_state(state_source);
        Ok(shell)
    }
}

pub struct SubclassAopProxy {
    factory: SubclassFactory,
    handler: Arc<InvocationHandler>,
    bean_factory: Arc<dyn BeanFactory>,
}

impl SubclassAopProxy {
    pub fn new(
        descriptor: ProxyDescriptor,
        bean_factory: Arc<dyn BeanFactory>,
        subclass_builder: &dyn SubclassBuilder,
    ) -> AopResult<Self> {
        let factory = subclass_builder.build(&descriptor.target.bean_class())?;
        Ok(Self {
            factory,
            handler: Arc::new(InvocationHandler::new(descriptor, Arc::clone(&bean_factory))),
            bean_factory,
        })
    }

    pub fn proxy_class(&self) -> &Arc<BeanClass> {
        self.factory.proxy_class()
    }
}

impl AopProxy for SubclassAopProxy {
    fn get_proxy(&self) -> AopResult<Arc<dyn BeanObject>> {
        self.get_proxy_with(self.bean_factory.as_ref())
    }

    fn get_proxy_with(&self, bean_factory: &dyn BeanFactory) -> AopResult<Arc<dyn BeanObject>> {
        self.factory
            .new_instance(bean_factory, Arc::clone(&self.handler))
    }

    fn mechanism(&self) -> ProxyMechanism {
        ProxyMechanism::Subclass
    }
}

/// 从 `source` 重新复制子类代理壳实例的状态
///
/// 不是子类代理或没有壳实例时返回 false
pub(crate) fn refresh_shell_state(proxy: &dyn BeanObject, source: &dyn BeanObject) -> bool {
    let Some(proxy) = proxy.downcast_ref::<SubclassProxyObject>() else {
        return false;
    };
    match &proxy.shell {
        Some(shell) => {
            shell.write().transfer_state(source);
            tracing::trace!("State of '{}' refreshed from initialized bean", proxy.class.name());
            true
        }
        None => false,
    }
}

/// 子类代理对象
struct SubclassProxyObject {
    class: Arc<BeanClass>,
    /// 自调用会重入，读锁使用 `read_recursive`
    shell: Option<RwLock<Box<dyn BeanObject>>>,
    handler: Arc<InvocationHandler>,
    nested: bool,
}

impl BeanObject for SubclassProxyObject {
    fn bean_class(&self) -> Arc<BeanClass> {
        Arc::clone(&self.class)
    }

    fn dispatch(&self, this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        if method.is_overridable() {
            return match (&self.shell, self.nested) {
                (Some(shell), true) => {
                    let shell = shell.read_recursive();
                    let super_method = SuperMethod::new(shell.as_ref());
                    self.handler.invoke(this, method, args, Some(super_method))
                }
                _ => self.handler.invoke(this, method, args, None),
            };
        }

        // 不可重写的方法不经过通知，在父类部分上执行
        match &self.shell {
            Some(shell) => shell.read_recursive().dispatch(this, method, args),
            None => Err(AopError::MethodNotExposed {
                proxy: self.class.name().to_string(),
                method: method.name().to_string(),
            }
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
