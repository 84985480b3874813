use hydra_aop::prelude::*;
use hydra_core::prelude::*;
use hydra_core::{EnvironmentPropertySource, InjectionPoint};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ==================== 配置 ====================

const APPLICATION_TOML: &str = r#"
[logging]
level = "info"
format = "compact"

[hydra.aop]
enabled = true
proxy-target-class = false
"#;

// ==================== 切面 ====================

/// 审计切面 - 通过 inventory 自动注册
struct AuditAspect;

impl Aspect for AuditAspect {
    fn name(&self) -> &str {
        "AuditAspect"
    }

    fn order(&self) -> i32 {
        10
    }

    fn advisors(&self) -> AopResult<Vec<Advisor>> {
        AspectBuilder::new(self.name(), self.order())
            .advice(
                "execution(* InventoryService.reserve*(..))",
                Advice::before("AuditAspect::before", |jp| {
                    tracing::info!("📝 Audit: {} requested by {}", jp.signature(), jp.bean_name());
                    Ok(())
                }),
            )
            .advice(
                "within(Greeter)",
                Advice::after_returning("AuditAspect::after_returning", |jp, result| {
                    let greeting = result.and_then(|v| v.downcast_ref::<String>());
                    tracing::info!("📝 Audit: {} returned {:?}", jp.signature(), greeting);
                    Ok(())
                }),
            )
            .build()
    }
}

fn create_audit_aspect() -> Arc<dyn Aspect> {
    Arc::new(AuditAspect)
}

inventory::submit! {
    AspectRegistration::new("AuditAspect", create_audit_aspect)
}

// ==================== 业务服务 ====================

/// 库存服务 - 没有接口，自调用也需要经过通知链
struct InventoryService {
    stock: AtomicU64,
}

impl InventoryService {
    fn class() -> Arc<BeanClass> {
        BeanClass::builder("InventoryService")
            .method("reserve")
            .method("reserve_pair")
            .final_method("stock")
            .constructor(|_factory| {
                Ok(Box::new(InventoryService {
                    stock: AtomicU64::new(0),
                }))
            })
            .build()
    }
}

impl BeanObject for InventoryService {
    fn bean_class(&self) -> Arc<BeanClass> {
        Self::class()
    }

    fn dispatch(&self, this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        match method.name() {
            "reserve" => {
                let quantity = *arg_ref::<u64>(&args, 0)?;
                let stock = self.stock.load(Ordering::SeqCst);
                if quantity > stock {
                    return Err(anyhow!("insufficient stock: {} requested, {} left", quantity, stock));
                }
                self.stock.fetch_sub(quantity, Ordering::SeqCst);
                Ok(Some(value(stock - quantity)))
            }
            "reserve_pair" => {
                this.invoke("reserve", args.clone())?;
                this.invoke("reserve", args)
            }
            "stock" => Ok(Some(value(self.stock.load(Ordering::SeqCst)))),
            other => Err(anyhow!("InventoryService has no method '{}'", other)),
        }
    }

    fn transfer_state(&mut self, source: &dyn BeanObject) {
        if let Some(source) = source.downcast_ref::<InventoryService>() {
            self.stock = AtomicU64::new(source.stock.load(Ordering::SeqCst));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 问候服务 - 实现 Greeter 接口
struct GreetingService {
    prefix: String,
}

impl BeanObject for GreetingService {
    fn bean_class(&self) -> Arc<BeanClass> {
        BeanClass::builder("GreetingService")
            .interface_method("Greeter", "greet")
            .build()
    }

    fn dispatch(&self, _this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        match method.name() {
            "greet" => {
                let name = arg_ref::<String>(&args, 0)?;
                Ok(Some(value(format!("{}, {}!", self.prefix, name))))
            }
            other => Err(anyhow!("GreetingService has no method '{}'", other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ==================== 主程序 ====================

fn main() -> anyhow::Result<()> {
    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║     Hydra AOP - Proxy Demo                         ║");
    println!("╚════════════════════════════════════════════════════╝\n");

    let env = Environment::new();
    env.add_property_source(Box::new(TomlPropertySource::from_str(
        APPLICATION_TOML,
        "application.toml",
    )?));
    env.add_property_source(Box::new(EnvironmentPropertySource::new("HYDRA_DEMO")));

    LoggingConfig::from_environment(&env)?.init()?;

    let factory = Arc::new(DefaultBeanFactory::new());
    factory.register_bean_definition(
        BeanDefinition::new("inventoryService")
            .with_class(InventoryService::class())
            .with_proxy_mode(ProxyMode::SupportNested),
    )?;
    factory.register_bean_definition(BeanDefinition::new("greetingService"))?;
    factory.register_bean_definition(
        BeanDefinition::new("frontDesk")
            .with_dependency(DependencyRef::by_type(InjectionPoint::Field, TypeRef::interface("Greeter"))),
    )?;

    let mut registry = AdvisorRegistry::new();
    let loaded = registry.auto_load_aspects()?;
    registry.register_aspect(&LoggingAspect::new("within(*Service)").with_args().with_order(100))?;
    registry.register_aspect(&PerformanceAspect::new(50, "*"))?;
    registry.register_aspect(&ExceptionLoggingAspect::new("execution(* InventoryService.*(..))"))?;
    tracing::info!("Loaded {} aspect(s) via inventory, {} advisor(s) total", loaded, registry.len());

    let processor = AopBeanPostProcessor::new(
        registry,
        Arc::clone(&factory) as Arc<dyn BeanFactory>,
        AopProperties::from_environment(&env)?,
    );
    factory.add_bean_post_processor(Arc::new(processor));

    let inventory = factory.register_singleton(
        "inventoryService",
        Arc::new(InventoryService {
            stock: AtomicU64::new(10),
        }),
    )?;
    let greeter = factory.register_singleton(
        "greetingService",
        Arc::new(GreetingService {
            prefix: "Hello".to_string(),
        }),
    )?;

    println!("🔷 inventoryService -> {}", inventory.bean_class().name());
    println!("🔷 greetingService  -> {}", greeter.bean_class().name());

    let left = inventory.invoke("reserve_pair", vec![value(3_u64)])?;
    println!(
        "📦 Stock after reserving 2 x 3: {:?}",
        left.as_ref().and_then(|v| v.downcast_ref::<u64>())
    );

    if let Err(e) = inventory.invoke("reserve", vec![value(100_u64)]) {
        println!("❌ Reservation rejected: {}", e);
    }

    let greeting = greeter.invoke("greet", vec![value("Hydra".to_string())])?;
    println!(
        "👋 {}",
        greeting
            .as_ref()
            .and_then(|v| v.downcast_ref::<String>())
            .map(String::as_str)
            .unwrap_or_default()
    );

    println!("\n✅ Demo finished with {} singleton(s)", factory.singleton_count());
    Ok(())
}
