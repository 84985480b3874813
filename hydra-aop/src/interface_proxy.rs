//! 接口代理
//!
//! 生成的代理类型实现目标的全部接口，只暴露接口声明的方法

use hydra_core::{
    Args, BeanClass, BeanFactory, BeanObject, InvocationResult, Method, ProxyMechanism,
};
use std::any::Any;
use std::sync::Arc;

use crate::error::{AopError, AopResult};
use crate::proxy::{AopProxy, InvocationHandler, ProxyDescriptor};

pub struct InterfaceAopProxy {
    proxy_class: Arc<BeanClass>,
    handler: Arc<InvocationHandler>,
}

impl InterfaceAopProxy {
    pub fn new(descriptor: ProxyDescriptor, bean_factory: Arc<dyn BeanFactory>) -> AopResult<Self> {
        let target_class = descriptor.target.bean_class();
        let interfaces = target_class.all_interfaces();
        if interfaces.is_empty() {
            return Err(AopError::NoInterfaces(target_class.name().to_string()));
        }

        let mut builder = BeanClass::builder(format!("$Proxy[{}]", interfaces.join(", ")))
            .proxy_origin(ProxyMechanism::Interfaces);
        for interface in &interfaces {
            builder = builder.implements(interface.clone());
        }
        for method in target_class
            .all_methods()
            .into_iter()
            .filter(|m| m.declaring_interface().is_some())
        {
            builder = builder.with_method(method);
        }

        Ok(Self {
            proxy_class: builder.build(),
            handler: Arc::new(InvocationHandler::new(descriptor, bean_factory)),
        })
    }

    pub fn proxy_class(&self) -> &Arc<BeanClass> {
        &self.proxy_class
    }
}

impl AopProxy for InterfaceAopProxy {
    fn get_proxy(&self) -> AopResult<Arc<dyn BeanObject>> {
        Ok(Arc::new(InterfaceProxyObject {
            class: Arc::clone(&self.proxy_class),
            handler: Arc::clone(&self.handler),
        }))
    }

    /// 接口代理不需要构造壳实例，容器参数不参与
    fn get_proxy_with(&self, _bean_factory: &dyn BeanFactory) -> AopResult<Arc<dyn BeanObject>> {
        self.get_proxy()
    }

    fn mechanism(&self) -> ProxyMechanism {
        ProxyMechanism::Interfaces
    }
}

/// 接口代理对象
struct InterfaceProxyObject {
    class: Arc<BeanClass>,
    handler: Arc<InvocationHandler>,
}

impl BeanObject for InterfaceProxyObject {
    fn bean_class(&self) -> Arc<BeanClass> {
        Arc::clone(&self.class)
    }

    fn dispatch(&self, this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        let exposed = self
            .class
            .find_method(method.name())
            .is_some_and(|m| m.declaring_interface().is_some());
        if !exposed {
            return Err(AopError::MethodNotExposed {
                proxy: self.class.name().to_string(),
                method: method.name().to_string(),
            }
            .into());
        }
        self.handler.invoke(this, method, args, None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
