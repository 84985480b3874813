//! 连接点（JoinPoint）定义
//!
//! 连接点描述一次被拦截的方法调用：目标、代理、方法、参数以及调用时间

use hydra_core::{Args, BeanFactory, BeanObject, InvocationResult, Method, Value};
use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::AdviceChainInvocation;

/// 连接点信息
///
/// 参数可以被前置通知或环绕通知改写，改写对后续通知与目标方法可见
pub struct JoinPoint<'a> {
    bean_name: &'a str,
    target: Arc<dyn BeanObject>,
    proxy: &'a dyn BeanObject,
    method: &'a Method,
    args: Args,
    bean_factory: &'a dyn BeanFactory,
    timestamp: Instant,
}

impl<'a> JoinPoint<'a> {
    pub fn new(
        bean_name: &'a str,
        target: Arc<dyn BeanObject>,
        proxy: &'a dyn BeanObject,
        method: &'a Method,
        args: Args,
        bean_factory: &'a dyn BeanFactory,
    ) -> Self {
        Self {
            bean_name,
            target,
            proxy,
            method,
            args,
            bean_factory,
            timestamp: Instant::now(),
        }
    }

    pub fn bean_name(&self) -> &str {
        self.bean_name
    }

    pub fn target(&self) -> &Arc<dyn BeanObject> {
        &self.target
    }

    /// 替换本次调用剩余部分使用的目标对象
    pub fn set_target(&mut self, target: Arc<dyn BeanObject>) {
        self.target = target;
    }

    /// 代理对象本身（相当于 `this`）
    pub fn proxy(&self) -> &'a dyn BeanObject {
        self.proxy
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn bean_factory(&self) -> &'a dyn BeanFactory {
        self.bean_factory
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// 按类型读取参数
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref::<T>()
    }

    /// 改写第 `index` 个参数，返回旧值；越界时忽略
    pub fn set_arg(&mut self, index: usize, value: Value) -> Option<Value> {
        let slot = self.args.get_mut(index)?;
        Some(std::mem::replace(slot, value))
    }

    pub fn set_args(&mut self, args: Args) {
        self.args = args;
    }

    pub(crate) fn args_snapshot(&self) -> Args {
        self.args.clone()
    }

    /// 方法签名，例如 `OrderService::place_order`
    pub fn signature(&self) -> String {
        self.method.signature()
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("bean_name", &self.bean_name)
            .field("signature", &self.signature())
            .field("args", &self.args.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution({}(..))", self.signature())
    }
}

/// 环绕通知看到的连接点
///
/// `proceed()` 可以调用多次，每次都从该环绕通知之后的位置重新执行剩余通知链
pub struct ProceedingJoinPoint<'c, 'a> {
    chain: &'c mut AdviceChainInvocation<'a>,
    resume_at: usize,
}

impl<'c, 'a> ProceedingJoinPoint<'c, 'a> {
    pub(crate) fn new(chain: &'c mut AdviceChainInvocation<'a>) -> Self {
        let resume_at = chain.cursor();
        Self { chain, resume_at }
    }

    /// 继续执行剩余通知链与目标方法
    pub fn proceed(&mut self) -> InvocationResult {
        self.chain.reset_cursor(self.resume_at);
        self.chain.proceed()
    }

    /// 使用新的参数继续执行
    pub fn proceed_with(&mut self, args: Args) -> InvocationResult {
        self.chain.join_point_mut().set_args(args);
        self.proceed()
    }
}

impl<'a> Deref for ProceedingJoinPoint<'_, 'a> {
    type Target = JoinPoint<'a>;

    fn deref(&self) -> &Self::Target {
        self.chain.join_point()
    }
}

impl DerefMut for ProceedingJoinPoint<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.chain.join_point_mut()
    }
}

impl fmt::Debug for ProceedingJoinPoint<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("join_point", self.chain.join_point())
            .field("resume_at", &self.resume_at)
            .finish()
    }
}
