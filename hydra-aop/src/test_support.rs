//! 测试夹具

use hydra_core::{
    arg_ref, value, Args, BeanClass, BeanObject, DefaultBeanFactory, InvocationResult, Method,
};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::aspect::{Aspect, AspectBuilder, AspectRegistration};
use crate::error::AopResult;

pub const TEST_ASPECT_NAME: &str = "InventoryTestAspect";

struct InventoryTestAspect;

impl Aspect for InventoryTestAspect {
    fn name(&self) -> &str {
        TEST_ASPECT_NAME
    }

    fn advisors(&self) -> AopResult<Vec<Advisor>> {
        AspectBuilder::new(TEST_ASPECT_NAME, 0)
            .advice(
                "within(NeverMatched)",
                Advice::before(format!("{}::before", TEST_ASPECT_NAME), |_jp| Ok(())),
            )
            .build()
    }
}

fn create_inventory_test_aspect() -> Arc<dyn Aspect> {
    Arc::new(InventoryTestAspect)
}

inventory::submit! {
    AspectRegistration::new(TEST_ASPECT_NAME, create_inventory_test_aspect)
}

pub fn test_factory() -> Arc<DefaultBeanFactory> {
    static TRACING: Once = Once::new();
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    });
    Arc::new(DefaultBeanFactory::new())
}

/// 记录通知执行顺序
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: &str) {
        self.0.lock().push(entry.to_string());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// 目标方法的调用计数，并记录最后一次调用收到的参数缓冲区地址
#[derive(Default)]
pub struct CallCounter {
    calls: AtomicUsize,
    last_args: Mutex<Option<usize>>,
}

impl CallCounter {
    fn record(&self, args: &Args) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock() = Some(args.as_ptr() as usize);
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_args_buffer(&self) -> Option<usize> {
        *self.last_args.lock()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    #[error("calculation failed")]
    Boom,
}

/// 没有接口的具体类型，可以通过构造函数创建壳实例
pub struct Calculator {
    offset: i64,
    counter: Arc<CallCounter>,
}

impl Calculator {
    pub const CLASS_NAME: &'static str = "Calculator";
}

pub fn calculator_class() -> Arc<BeanClass> {
    BeanClass::builder(Calculator::CLASS_NAME)
        .method("add")
        .method("add_twice")
        .method("fail")
        .final_method("offset")
        .constructor(|_factory| {
            Ok(Box::new(Calculator {
                offset: 0,
                counter: Arc::new(CallCounter::default()),
            }))
        })
        .build()
}

pub fn calculator() -> (Arc<dyn BeanObject>, Arc<CallCounter>) {
    calculator_with_offset(0)
}

pub fn calculator_with_offset(offset: i64) -> (Arc<dyn BeanObject>, Arc<CallCounter>) {
    let counter = Arc::new(CallCounter::default());
    let calculator = Calculator {
        offset,
        counter: Arc::clone(&counter),
    };
    (Arc::new(calculator), counter)
}

fn result_i64(result: &Option<hydra_core::Value>) -> i64 {
    result
        .as_ref()
        .and_then(|v| v.downcast_ref::<i64>())
        .copied()
        .unwrap_or_default()
}

impl BeanObject for Calculator {
    fn bean_class(&self) -> Arc<BeanClass> {
        calculator_class()
    }

    fn dispatch(&self, this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        match method.name() {
            "add" => {
                self.counter.record(&args);
                let a = *arg_ref::<i64>(&args, 0)?;
                let b = *arg_ref::<i64>(&args, 1)?;
                Ok(Some(value(a + b + self.offset)))
            }
            "add_twice" => {
                let first = this.invoke("add", args.clone())?;
                let second = this.invoke("add", args)?;
                Ok(Some(value(result_i64(&first) + result_i64(&second))))
            }
            "fail" => Err(CalcError::Boom.into()),
            "offset" => Ok(Some(value(self.offset))),
            other => Err(anyhow::anyhow!("Calculator has no method '{}'", other)),
        }
    }

    fn transfer_state(&mut self, source: &dyn BeanObject) {
        if let Some(source) = source.downcast_ref::<Calculator>() {
            self.offset = source.offset;
            self.counter = Arc::clone(&source.counter);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FinalCalculator;

impl BeanObject for FinalCalculator {
    fn bean_class(&self) -> Arc<BeanClass> {
        BeanClass::builder("FinalCalculator")
            .method("add")
            .final_class()
            .build()
    }

    fn dispatch(&self, _this: &dyn BeanObject, _method: &Method, _args: Args) -> InvocationResult {
        Ok(None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn final_calculator() -> Arc<dyn BeanObject> {
    Arc::new(FinalCalculator)
}

/// 实现 `OrderApi` 接口的类型，没有注册构造函数
pub struct OrderService {
    next_id: AtomicU64,
    counter: Arc<CallCounter>,
}

impl BeanObject for OrderService {
    fn bean_class(&self) -> Arc<BeanClass> {
        BeanClass::builder("OrderService")
            .interface_method("OrderApi", "place_order")
            .interface_method("OrderApi", "get_order")
            .method("reindex")
            .build()
    }

    fn dispatch(&self, _this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        match method.name() {
            "place_order" => {
                self.counter.record(&args);
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Some(value(id)))
            }
            "get_order" => {
                let id = *arg_ref::<u64>(&args, 0)?;
                Ok(Some(value(format!("order-{}", id))))
            }
            "reindex" => Ok(None),
            other => Err(anyhow::anyhow!("OrderService has no method '{}'", other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn order_service() -> (Arc<dyn BeanObject>, Arc<CallCounter>) {
    let counter = Arc::new(CallCounter::default());
    let service = OrderService {
        next_id: AtomicU64::new(0),
        counter: Arc::clone(&counter),
    };
    (Arc::new(service), counter)
}

/// 切面类型的 Bean
#[derive(Default)]
pub struct AdvisorBean;

impl BeanObject for AdvisorBean {
    fn bean_class(&self) -> Arc<BeanClass> {
        BeanClass::builder("AuditAspect").method("audit").build()
    }

    fn dispatch(&self, _this: &dyn BeanObject, _method: &Method, _args: Args) -> InvocationResult {
        Ok(None)
    }

    fn is_advisor(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
