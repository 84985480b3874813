//! AOP BeanPostProcessor - 自动为匹配切点的 Bean 创建代理
//!
//! 单例且已注册定义的 Bean 的代理按名称缓存，
//! 提前暴露引用与初始化后处理对同一个 Bean 返回同一个代理

use dashmap::DashMap;
use hydra_core::{
    BeanFactory, BeanObject, BeanPostProcessor, ContainerError, ContainerResult, ProxyMode,
};
use std::sync::Arc;

use crate::error::AopResult;
use crate::properties::AopProperties;
use crate::proxy::{ProxyDescriptor, ProxyFactory};
use crate::registry::AdvisorRegistry;
use crate::strategy::ProxyStrategySelector;
use crate::subclass_proxy::{refresh_shell_state, DispatchTableSubclassBuilder, SubclassBuilder};

/// AOP BeanPostProcessor
///
/// ## 工作原理
///
/// 1. 切面对象、关闭代理的 Bean 以及 AOP 未启用时直接返回原对象
/// 2. 按类型级切点筛选通知器，没有匹配时直接返回原对象
/// 3. 由策略选择器决定接口代理或子类代理，创建代理对象
///
/// 处理器持有容器的引用，而容器又持有处理器，两者生命周期与应用一致
///
/// ## 使用示例
///
/// ```ignore
/// let factory = Arc::new(DefaultBeanFactory::new());
/// let processor = AopBeanPostProcessor::new(registry, factory.clone(), AopProperties::default());
/// factory.add_bean_post_processor(Arc::new(processor));
/// ```
pub struct AopBeanPostProcessor {
    registry: AdvisorRegistry,
    bean_factory: Arc<dyn BeanFactory>,
    selector: ProxyStrategySelector,
    subclass_builder: Arc<dyn SubclassBuilder>,
    /// 并发首次访问时可能各自创建代理，后写入者覆盖，代理本身不携带缓存相关状态
    proxy_cache: DashMap<String, Arc<dyn BeanObject>>,
    enabled: bool,
}

impl AopBeanPostProcessor {
    /// 创建处理器，注册表在此封存
    pub fn new(
        mut registry: AdvisorRegistry,
        bean_factory: Arc<dyn BeanFactory>,
        properties: AopProperties,
    ) -> Self {
        registry.seal();
        tracing::info!(
            "🔷 [AOP] Auto proxy enabled={} with {} advisor(s), proxy-target-class={}",
            properties.enabled,
            registry.len(),
            properties.proxy_target_class
        );
        Self {
            registry,
            bean_factory,
            selector: ProxyStrategySelector::new(properties.proxy_target_class),
            subclass_builder: Arc::new(DispatchTableSubclassBuilder),
            proxy_cache: DashMap::new(),
            enabled: properties.enabled,
        }
    }

    /// 替换子类生成实现
    pub fn with_subclass_builder(mut self, builder: Arc<dyn SubclassBuilder>) -> Self {
        self.subclass_builder = builder;
        self
    }

    pub fn registry(&self) -> &AdvisorRegistry {
        &self.registry
    }

    pub fn cached_proxy(&self, bean_name: &str) -> Option<Arc<dyn BeanObject>> {
        self.proxy_cache
            .get(bean_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// 为 Bean 创建代理，不需要代理时返回原对象
    pub fn create_proxy(
        &self,
        bean_name: &str,
        target: Arc<dyn BeanObject>,
    ) -> AopResult<Arc<dyn BeanObject>> {
        if !self.enabled || target.is_advisor() {
            return Ok(target);
        }

        let factory = self.bean_factory.as_ref();
        let mode = self
            .selector
            .resolve_proxy_mode(target.as_ref(), bean_name, factory);
        if mode == ProxyMode::No {
            tracing::trace!("Bean '{}' opted out of proxying", bean_name);
            return Ok(target);
        }

        let cacheable =
            factory.contains_bean_definition(bean_name) && factory.is_singleton(bean_name);
        if cacheable {
            if let Some(proxy) = self.cached_proxy(bean_name) {
                tracing::trace!("Reusing cached proxy for bean '{}'", bean_name);
                return Ok(proxy);
            }
        }

        let target_class = target.bean_class().user_class();
        let advisors = self.registry.matching_advisors(bean_name, &target_class);
        if advisors.is_empty() {
            tracing::trace!("Bean '{}' does not match any advisor, skipping proxy", bean_name);
            return Ok(target);
        }

        let mechanism = self.selector.select(target.as_ref(), bean_name, mode, factory);
        let descriptor = ProxyDescriptor {
            bean_name: bean_name.to_string(),
            target,
            target_class,
            advisors,
            supports_nested_invocation: mode == ProxyMode::SupportNested,
            mechanism,
        };
        let proxy = ProxyFactory::create_aop_proxy(
            descriptor,
            Arc::clone(&self.bean_factory),
            self.subclass_builder.as_ref(),
        )?
        .get_proxy()?;

        if cacheable {
            self.proxy_cache
                .insert(bean_name.to_string(), Arc::clone(&proxy));
        }

        tracing::info!(
            "🔷 [AOP] Bean '{}' proxied as '{}'",
            bean_name,
            proxy.bean_class().name()
        );
        Ok(proxy)
    }

    fn wrap(&self, bean: Arc<dyn BeanObject>, bean_name: &str) -> ContainerResult<Arc<dyn BeanObject>> {
        self.create_proxy(bean_name, bean)
            .map_err(|e| ContainerError::PostProcessingFailed {
                bean: bean_name.to_string(),
                source: e.into(),
            })
    }
}

impl BeanPostProcessor for AopBeanPostProcessor {
    fn name(&self) -> &str {
        "AopBeanPostProcessor"
    }

    fn order(&self) -> i32 {
        // 在其他处理器之后执行，代理包装最终的对象
        2000
    }

    fn get_early_bean_reference(
        &self,
        bean: Arc<dyn BeanObject>,
        bean_name: &str,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        self.wrap(bean, bean_name)
    }

    /// 返回的代理可能来自提前暴露引用时的缓存，此时壳实例的状态需要从初始化完成的 Bean 重新复制
    fn post_process_after_initialization(
        &self,
        bean: Arc<dyn BeanObject>,
        bean_name: &str,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        let proxy = self.wrap(Arc::clone(&bean), bean_name)?;
        if !Arc::ptr_eq(&proxy, &bean) {
            refresh_shell_state(proxy.as_ref(), bean.as_ref());
        }
        Ok(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::advisor::Advisor;
    use crate::aspect::ExceptionLoggingAspect;
    use crate::error::AopError;
    use crate::test_support::{
        calculator, calculator_class, calculator_with_offset, final_calculator, order_service, test_factory, AdvisorBean,
        CallLog, CalcError,
    };
    use hydra_core::{
        value, Args, BeanDefinition, DefaultBeanFactory, ProxyMechanism, Scope,
    };

    fn registry_with(advisors: Vec<Advisor>) -> AdvisorRegistry {
        let mut registry = AdvisorRegistry::new();
        for advisor in advisors {
            registry.register(advisor).unwrap();
        }
        registry
    }

    fn logging_advisor(expression: &str, name: &str, log: &CallLog) -> Advisor {
        let log = log.clone();
        let label = name.to_string();
        Advisor::from_expression(
            expression,
            Advice::before(name, move |_jp| {
                log.push(&label);
                Ok(())
            }),
        )
        .unwrap()
    }

    fn processor(
        factory: &Arc<DefaultBeanFactory>,
        advisors: Vec<Advisor>,
        properties: AopProperties,
    ) -> AopBeanPostProcessor {
        let bean_factory: Arc<dyn BeanFactory> = factory.clone();
        AopBeanPostProcessor::new(registry_with(advisors), bean_factory, properties)
    }

    fn add(bean: &Arc<dyn BeanObject>, a: i64, b: i64) -> anyhow::Result<i64> {
        let result = bean.invoke("add", vec![value(a), value(b)])?;
        Ok(*result.unwrap().downcast_ref::<i64>().unwrap())
    }

    fn register_calculator(factory: &DefaultBeanFactory, scope: Scope, mode: ProxyMode) {
        factory
            .register_bean_definition(
                BeanDefinition::new("calculator")
                    .with_class(calculator_class())
                    .with_scope(scope)
                    .with_proxy_mode(mode),
            )
            .unwrap();
    }

    #[test]
    fn test_no_matching_advisor_returns_target() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("within(Nothing*)", "never", &log)],
            AopProperties::default(),
        );

        let (target, _) = calculator();
        let result = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        assert!(Arc::ptr_eq(&result, &target));
    }

    #[test]
    fn test_singleton_proxy_is_cached() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::Auto);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator();
        let first = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        let second = processor.create_proxy("calculator", target).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(processor.cached_proxy("calculator").is_some());
    }

    #[test]
    fn test_prototype_and_unregistered_beans_get_fresh_proxies() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Prototype, ProxyMode::Auto);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator();
        let first = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        let second = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        let third = processor.create_proxy("adhoc", Arc::clone(&target)).unwrap();
        let fourth = processor.create_proxy("adhoc", target).unwrap();
        assert!(!Arc::ptr_eq(&third, &fourth));
        assert!(processor.cached_proxy("calculator").is_none());
    }

    #[test]
    fn test_advisor_beans_and_opt_out_are_never_proxied() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::No);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let advisor_bean: Arc<dyn BeanObject> = Arc::new(AdvisorBean::default());
        let result = processor.create_proxy("auditAspect", Arc::clone(&advisor_bean)).unwrap();
        assert!(Arc::ptr_eq(&result, &advisor_bean));

        let (target, _) = calculator();
        let result = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        assert!(Arc::ptr_eq(&result, &target));
    }

    #[test]
    fn test_disabled_processor_returns_target() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("*", "log", &log)],
            AopProperties {
                enabled: false,
                ..AopProperties::default()
            },
        );

        let (target, _) = calculator();
        let result = processor.create_proxy("calculator", Arc::clone(&target)).unwrap();
        assert!(Arc::ptr_eq(&result, &target));
    }

    #[test]
    fn test_registry_is_sealed_by_processor() {
        let factory = test_factory();
        let processor = processor(&factory, Vec::new(), AopProperties::default());
        assert!(processor.registry().is_sealed());
    }

    #[test]
    fn test_subclass_proxy_intercepts_and_keeps_type() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("execution(* Calculator.add(..))", "add", &log)],
            AopProperties::default(),
        );

        let (target, calls) = calculator();
        let proxy = processor.create_proxy("calculator", target).unwrap();
        let class = proxy.bean_class();
        assert_eq!(class.proxy_origin(), Some(ProxyMechanism::Subclass));
        assert!(class.is_assignable_to("Calculator"));
        assert_eq!(class.user_class().name(), "Calculator");

        assert_eq!(add(&proxy, 2, 3).unwrap(), 5);
        assert_eq!(calls.count(), 1);
        assert_eq!(log.take(), vec!["add"]);
    }

    #[test]
    fn test_interface_proxy_exposes_only_interface_methods() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("within(OrderService)", "orders", &log)],
            AopProperties::default(),
        );

        let (target, placed) = order_service();
        let proxy = processor.create_proxy("orderService", target).unwrap();
        let class = proxy.bean_class();
        assert_eq!(class.proxy_origin(), Some(ProxyMechanism::Interfaces));
        assert!(class.is_assignable_to("OrderApi"));
        assert!(!class.is_assignable_to("OrderService"));

        let id = proxy.invoke("place_order", vec![value("book".to_string())]).unwrap();
        assert_eq!(id.unwrap().downcast_ref::<u64>(), Some(&1));
        assert_eq!(placed.count(), 1);
        assert_eq!(log.take(), vec!["orders"]);

        // 非接口方法不在代理类型上
        assert!(proxy.invoke("reindex", Vec::new()).is_err());
    }

    #[test]
    fn test_fast_path_moves_caller_args() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("execution(* Calculator.fail(..))", "fail-only", &log)],
            AopProperties::default(),
        );

        let (target, calls) = calculator();
        let proxy = processor.create_proxy("calculator", target).unwrap();

        let args: Args = vec![value(1_i64), value(2_i64)];
        let buffer = args.as_ptr() as usize;
        proxy.invoke("add", args).unwrap();
        assert_eq!(calls.last_args_buffer(), Some(buffer));
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_nested_invocation_intercepts_self_calls() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::SupportNested);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator();
        let proxy = processor.create_proxy("calculator", target).unwrap();
        let result = proxy.invoke("add_twice", vec![value(1_i64), value(2_i64)]).unwrap();
        assert_eq!(result.unwrap().downcast_ref::<i64>(), Some(&6));
        // add_twice 本身加上两次自调用 add
        assert_eq!(log.take(), vec!["log", "log", "log"]);
    }

    #[test]
    fn test_without_nested_support_self_calls_bypass_advice() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator();
        let proxy = processor.create_proxy("calculator", target).unwrap();
        proxy.invoke("add_twice", vec![value(1_i64), value(2_i64)]).unwrap();
        assert_eq!(log.take(), vec!["log"]);
    }

    #[test]
    fn test_state_is_transferred_to_shell() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::SupportNested);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator_with_offset(10);
        let proxy = processor.create_proxy("calculator", target).unwrap();

        // 嵌套模式下真实方法在壳实例上执行，能看到复制过来的 offset
        assert_eq!(add(&proxy, 1, 1).unwrap(), 12);
        // 不可重写的方法直接在壳实例上执行，不经过通知
        let offset = proxy.invoke("offset", Vec::new()).unwrap();
        assert_eq!(offset.unwrap().downcast_ref::<i64>(), Some(&10));
        assert_eq!(log.take(), vec!["log"]);
    }

    #[test]
    fn test_final_class_cannot_be_subclassed() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let err = processor.create_proxy("calculator", final_calculator()).err().unwrap();
        assert!(matches!(err, AopError::FinalClass(name) if name == "FinalCalculator"));
    }

    #[test]
    fn test_missing_constructor_is_not_instantiable() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(
            &factory,
            vec![logging_advisor("*", "log", &log)],
            AopProperties {
                proxy_target_class: true,
                ..AopProperties::default()
            },
        );

        let (target, _) = order_service();
        let err = processor.create_proxy("orderService", target).err().unwrap();
        assert!(matches!(err, AopError::NotInstantiable { class, .. } if class == "OrderService"));
    }

    #[test]
    fn test_explicit_interfaces_without_interfaces_fails() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::Interfaces);
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let (target, _) = calculator();
        let err = processor.create_proxy("calculator", target).err().unwrap();
        assert!(matches!(err, AopError::NoInterfaces(_)));
    }

    #[test]
    fn test_early_reference_and_initialization_return_same_proxy() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::Auto);
        let log = CallLog::new();
        let processor = Arc::new(processor(
            &factory,
            vec![logging_advisor("*", "log", &log)],
            AopProperties::default(),
        ));
        factory.add_bean_post_processor(processor.clone());

        let (target, _) = calculator();
        let early = factory
            .get_early_bean_reference("calculator", Arc::clone(&target))
            .unwrap();
        let registered = factory.register_singleton("calculator", target).unwrap();
        assert!(Arc::ptr_eq(&early, &registered));
        assert!(Arc::ptr_eq(&factory.get_bean("calculator").unwrap(), &registered));
    }

    #[test]
    fn test_early_proxy_picks_up_initialized_state() {
        let factory = test_factory();
        register_calculator(&factory, Scope::Singleton, ProxyMode::SupportNested);
        let log = CallLog::new();
        let processor = Arc::new(processor(
            &factory,
            vec![logging_advisor("*", "log", &log)],
            AopProperties::default(),
        ));
        factory.add_bean_post_processor(processor.clone());

        let (early_instance, _) = calculator_with_offset(0);
        let early = factory
            .get_early_bean_reference("calculator", early_instance)
            .unwrap();
        let (initialized, _) = calculator_with_offset(7);
        let registered = factory.register_singleton("calculator", initialized).unwrap();
        assert!(Arc::ptr_eq(&early, &registered));

        // 不可重写的方法与嵌套模式下的真实调用都在壳实例上执行
        let offset = registered.invoke("offset", Vec::new()).unwrap();
        assert_eq!(offset.unwrap().downcast_ref::<i64>(), Some(&7));
        assert_eq!(add(&registered, 1, 1).unwrap(), 9);
    }

    #[test]
    fn test_post_processing_failure_is_reported_as_container_error() {
        let factory = test_factory();
        let log = CallLog::new();
        let processor = processor(&factory, vec![logging_advisor("*", "log", &log)], AopProperties::default());

        let err = processor
            .post_process_after_initialization(final_calculator(), "calculator")
            .err()
            .unwrap();
        assert!(matches!(err, ContainerError::PostProcessingFailed { ref bean, .. } if bean == "calculator"));
    }

    #[test]
    fn test_exception_logging_aspect_rethrows_through_proxy() {
        let factory = test_factory();
        let mut registry = AdvisorRegistry::new();
        registry
            .register_aspect(&ExceptionLoggingAspect::new("within(Calculator)"))
            .unwrap();
        let bean_factory: Arc<dyn BeanFactory> = factory.clone();
        let processor = AopBeanPostProcessor::new(registry, bean_factory, AopProperties::default());

        let (target, _) = calculator();
        let proxy = processor.create_proxy("calculator", target).unwrap();
        let err = proxy.invoke("fail", Vec::new()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CalcError>(), Some(CalcError::Boom)));
    }
}
