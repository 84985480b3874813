//! 代理策略选择
//!
//! 规则按顺序判断，先命中者生效：
//! 1. 明确声明接口代理或子类代理
//! 2. 全局强制子类代理
//! 3. 目标没有实现任何接口
//! 4. 需要支持嵌套调用
//! 5. 其他 Bean 定义按名称或按具体类型直接依赖此 Bean
//!
//! 以上都不满足时使用接口代理

use hydra_core::{
    BeanClass, BeanFactory, BeanObject, DependencyTarget, ProxyMechanism, ProxyMode, TypeKind,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyStrategySelector {
    always_subclass: bool,
}

impl ProxyStrategySelector {
    pub fn new(always_subclass: bool) -> Self {
        Self { always_subclass }
    }

    pub fn always_subclass(&self) -> bool {
        self.always_subclass
    }

    /// Bean 的有效代理模式：定义上的明确声明优先，其次是类型上的声明
    ///
    /// 与只看定义的解析方式不同，定义存在但为 `Auto` 时仍会回退到类型上的声明；
    /// 两者都明确声明且不一致的情况在注册定义时已被拒绝
    pub fn resolve_proxy_mode(
        &self,
        bean: &dyn BeanObject,
        bean_name: &str,
        bean_factory: &dyn BeanFactory,
    ) -> ProxyMode {
        if bean_factory.contains_bean_definition(bean_name) {
            if let Ok(definition) = bean_factory.get_bean_definition(bean_name) {
                if definition.proxy_mode.is_explicit() {
                    return definition.proxy_mode;
                }
            }
        }
        bean.bean_class().user_class().proxy_mode()
    }

    pub fn select(
        &self,
        bean: &dyn BeanObject,
        bean_name: &str,
        mode: ProxyMode,
        bean_factory: &dyn BeanFactory,
    ) -> ProxyMechanism {
        let class = bean.bean_class();

        let (mechanism, reason) = match mode {
            ProxyMode::Interfaces => (ProxyMechanism::Interfaces, "declared interfaces"),
            ProxyMode::Subclass => (ProxyMechanism::Subclass, "declared subclass"),
            _ if self.always_subclass => (ProxyMechanism::Subclass, "proxy-target-class enabled"),
            _ if class.all_interfaces().is_empty() => (ProxyMechanism::Subclass, "no interfaces"),
            ProxyMode::SupportNested => (ProxyMechanism::Subclass, "nested invocation"),
            _ if Self::has_concrete_dependents(&class.user_class(), bean_name, bean_factory) => {
                (ProxyMechanism::Subclass, "injected by concrete type or name")
            }
            _ => (ProxyMechanism::Interfaces, "default"),
        };

        tracing::trace!(
            "Proxy strategy for '{}': {:?} ({})",
            bean_name,
            mechanism,
            reason
        );
        mechanism
    }

    /// 是否有其他定义按名称或按具体类型（本类型或其父类）直接依赖此 Bean
    ///
    /// 接口类型与基础类型的依赖不计入
    fn has_concrete_dependents(
        class: &BeanClass,
        bean_name: &str,
        bean_factory: &dyn BeanFactory,
    ) -> bool {
        let concrete_names: Vec<&str> = std::iter::once(class)
            .chain(class.ancestors())
            .map(BeanClass::name)
            .collect();

        bean_factory
            .get_bean_definitions()
            .iter()
            .filter(|definition| definition.name != bean_name)
            .flat_map(|definition| definition.dependencies.iter())
            .any(|dependency| match &dependency.target {
                DependencyTarget::ByName(name) => name == bean_name,
                DependencyTarget::ByType(type_ref) => {
                    type_ref.kind() == TypeKind::Class
                        && concrete_names.contains(&type_ref.name())
                }
            })
    }
}
