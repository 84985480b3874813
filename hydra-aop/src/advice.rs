//! 通知（Advice）定义
//!
//! 每个通知只有一种类型，由 `AdviceKind` 这个和类型表达，
//! 通知链按类型分派执行

use hydra_core::{InvocationResult, Value, LOWEST_PRECEDENCE};
use std::fmt;
use std::sync::Arc;

use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

/// 前置通知
///
/// 可以修改参数，修改对后续通知和目标方法可见
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, join_point: &mut JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 后置通知，具有 finally 语义
///
/// 返回错误时该错误替代原来的调用结果
pub trait AfterAdvice: Send + Sync {
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 返回后通知，可以看到返回值
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, join_point: &JoinPoint<'_>, result: Option<&Value>)
        -> anyhow::Result<()>;
}

/// 异常通知
///
/// 返回 `Ok(())` 表示异常已处理，此次调用以无返回值正常结束；
/// 返回 `Err` 则把该错误（可以是原错误）抛给调用方
pub trait AfterThrowingAdvice: Send + Sync {
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: anyhow::Error) -> anyhow::Result<()>;
}

/// 环绕通知
///
/// 由通知自己决定是否调用 `proceed()`，不调用时后续通知和目标方法都不会执行
pub trait AroundAdvice: Send + Sync {
    fn around(&self, pjp: ProceedingJoinPoint<'_, '_>) -> InvocationResult;
}

impl<F> BeforeAdvice for F
where
    F: Fn(&mut JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn before(&self, join_point: &mut JoinPoint<'_>) -> anyhow::Result<()> {
        self(join_point)
    }
}

impl<F> AfterAdvice for F
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        self(join_point)
    }
}

impl<F> AfterReturningAdvice for F
where
    F: Fn(&JoinPoint<'_>, Option<&Value>) -> anyhow::Result<()> + Send + Sync,
{
    fn after_returning(
        &self,
        join_point: &JoinPoint<'_>,
        result: Option<&Value>,
    ) -> anyhow::Result<()> {
        self(join_point, result)
    }
}

impl<F> AfterThrowingAdvice for F
where
    F: Fn(&JoinPoint<'_>, anyhow::Error) -> anyhow::Result<()> + Send + Sync,
{
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: anyhow::Error) -> anyhow::Result<()> {
        self(join_point, error)
    }
}

impl<F> AroundAdvice for F
where
    F: Fn(ProceedingJoinPoint<'_, '_>) -> InvocationResult + Send + Sync,
{
    fn around(&self, pjp: ProceedingJoinPoint<'_, '_>) -> InvocationResult {
        self(pjp)
    }
}

/// 通知的具体行为
#[derive(Clone)]
pub enum AdviceKind {
    Before(Arc<dyn BeforeAdvice>),
    After(Arc<dyn AfterAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
    Around(Arc<dyn AroundAdvice>),
}

impl AdviceKind {
    pub fn advice_type(&self) -> AdviceType {
        match self {
            AdviceKind::Before(_) => AdviceType::Before,
            AdviceKind::After(_) => AdviceType::After,
            AdviceKind::AfterReturning(_) => AdviceType::AfterReturning,
            AdviceKind::AfterThrowing(_) => AdviceType::AfterThrowing,
            AdviceKind::Around(_) => AdviceType::Around,
        }
    }
}

/// 通知
///
/// 名称用于日志，顺序决定执行先后（越小越先执行）。
/// 未声明顺序的通知使用所属切面的顺序，都没有时为 `LOWEST_PRECEDENCE`
#[derive(Clone)]
pub struct Advice {
    name: String,
    order: Option<i32>,
    kind: AdviceKind,
}

impl Advice {
    pub fn new(name: impl Into<String>, kind: AdviceKind) -> Self {
        Self {
            name: name.into(),
            order: None,
            kind,
        }
    }

    pub fn before<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, AdviceKind::Before(Arc::new(f)))
    }

    pub fn after<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, AdviceKind::After(Arc::new(f)))
    }

    pub fn after_returning<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, Option<&Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, AdviceKind::AfterReturning(Arc::new(f)))
    }

    pub fn after_throwing<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, anyhow::Error) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, AdviceKind::AfterThrowing(Arc::new(f)))
    }

    pub fn around<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ProceedingJoinPoint<'_, '_>) -> InvocationResult + Send + Sync + 'static,
    {
        Self::new(name, AdviceKind::Around(Arc::new(f)))
    }

    /// 声明通知自身的顺序，优先于切面顺序
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// 未声明顺序时使用 `fallback`
    pub fn or_order(mut self, fallback: i32) -> Self {
        self.order.get_or_insert(fallback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> i32 {
        self.order.unwrap_or(LOWEST_PRECEDENCE)
    }

    pub fn declared_order(&self) -> Option<i32> {
        self.order
    }

    pub fn kind(&self) -> &AdviceKind {
        &self.kind
    }

    pub fn advice_type(&self) -> AdviceType {
        self.kind.advice_type()
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advice")
            .field("name", &self.name)
            .field("type", &self.advice_type())
            .field("order", &self.order())
            .finish()
    }
}
