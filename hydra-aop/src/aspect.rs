//! 切面（Aspect）定义
//!
//! 切面把一组相关的通知及其切点打包在一起，并为其中未声明顺序的通知提供统一顺序

use hydra_core::LOWEST_PRECEDENCE;
use std::sync::Arc;
use std::time::Instant;

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::error::AopResult;
use crate::error_info::ErrorInfo;
use crate::pointcut::{Pointcut, PointcutExpression};

/// 切面 Trait
pub trait Aspect: Send + Sync {
    fn name(&self) -> &str;

    /// 切面顺序，只作用于未声明顺序的通知
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    /// 切面产生的通知器，按声明顺序排列
    fn advisors(&self) -> AopResult<Vec<Advisor>>;
}

enum PointcutSource {
    Expression(String),
    Pointcut(Arc<dyn Pointcut>),
}

/// 切面构建器
///
/// ```ignore
/// let advisors = AspectBuilder::new("AuditAspect", 10)
///     .advice("execution(* *Service.save*(..))", Advice::before("audit", |jp| {
///         tracing::info!("saving via {}", jp.signature());
///         Ok(())
///     }))
///     .build()?;
/// ```
pub struct AspectBuilder {
    name: String,
    order: i32,
    entries: Vec<(PointcutSource, Advice)>,
}

impl AspectBuilder {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            order,
            entries: Vec::new(),
        }
    }

    /// 使用切点表达式字符串，`build` 时解析
    pub fn advice(mut self, expression: impl Into<String>, advice: Advice) -> Self {
        self.entries
            .push((PointcutSource::Expression(expression.into()), advice));
        self
    }

    pub fn pointcut(mut self, pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        self.entries.push((PointcutSource::Pointcut(pointcut), advice));
        self
    }

    pub fn build(self) -> AopResult<Vec<Advisor>> {
        let mut advisors = Vec::with_capacity(self.entries.len());
        for (source, advice) in self.entries {
            let pointcut: Arc<dyn Pointcut> = match source {
                PointcutSource::Expression(expression) => {
                    Arc::new(PointcutExpression::parse(&expression)?)
                }
                PointcutSource::Pointcut(pointcut) => pointcut,
            };
            advisors.push(Advisor::new(pointcut, advice.or_order(self.order)));
        }
        tracing::trace!("Aspect '{}' built {} advisor(s)", self.name, advisors.len());
        Ok(advisors)
    }
}

/// 切面注册器
///
/// 用于 inventory 自动收集切面：
///
/// ```ignore
/// inventory::submit! {
///     AspectRegistration::new("AuditAspect", || Arc::new(AuditAspect::default()))
/// }
/// ```
pub struct AspectRegistration {
    pub name: &'static str,

    /// 创建切面实例的函数
    pub creator: fn() -> Arc<dyn Aspect>,
}

impl AspectRegistration {
    pub const fn new(name: &'static str, creator: fn() -> Arc<dyn Aspect>) -> Self {
        Self { name, creator }
    }

    pub fn create_instance(&self) -> Arc<dyn Aspect> {
        (self.creator)()
    }
}

inventory::collect!(AspectRegistration);

/// 获取所有注册的切面注册器
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}

// ============================================================================
// 预定义的常用切面
// ============================================================================

/// 日志切面 - 记录方法进入与退出
pub struct LoggingAspect {
    pointcut: String,
    order: i32,
    log_args: bool,
}

impl LoggingAspect {
    pub fn new(pointcut: impl Into<String>) -> Self {
        Self {
            pointcut: pointcut.into(),
            order: LOWEST_PRECEDENCE,
            log_args: false,
        }
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Aspect for LoggingAspect {
    fn name(&self) -> &str {
        "LoggingAspect"
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn advisors(&self) -> AopResult<Vec<Advisor>> {
        let log_args = self.log_args;
        AspectBuilder::new(self.name(), self.order)
            .advice(
                self.pointcut.clone(),
                Advice::before("LoggingAspect::before", move |jp| {
                    if log_args {
                        tracing::info!("→ Entering: {} with {} arg(s)", jp.signature(), jp.args().len());
                    } else {
                        tracing::info!("→ Entering: {}", jp.signature());
                    }
                    Ok(())
                }),
            )
            .advice(
                self.pointcut.clone(),
                Advice::after("LoggingAspect::after", |jp| {
                    tracing::info!("← Exiting: {} (took {:?})", jp.signature(), jp.elapsed());
                    Ok(())
                }),
            )
            .build()
    }
}

/// 性能监控切面
pub struct PerformanceAspect {
    threshold_ms: u128,
    pointcut: String,
}

impl PerformanceAspect {
    pub fn new(threshold_ms: u128, pointcut: impl Into<String>) -> Self {
        Self {
            threshold_ms,
            pointcut: pointcut.into(),
        }
    }
}

impl Aspect for PerformanceAspect {
    fn name(&self) -> &str {
        "PerformanceAspect"
    }

    fn advisors(&self) -> AopResult<Vec<Advisor>> {
        let threshold_ms = self.threshold_ms;
        AspectBuilder::new(self.name(), self.order())
            .advice(
                self.pointcut.clone(),
                Advice::around("PerformanceAspect::around", move |mut pjp| {
                    let started = Instant::now();
                    let result = pjp.proceed();
                    let elapsed = started.elapsed().as_millis();
                    if elapsed > threshold_ms {
                        tracing::warn!(
                            "⚠️ Slow method detected: {} took {}ms (threshold: {}ms)",
                            pjp.signature(),
                            elapsed,
                            threshold_ms
                        );
                    } else {
                        tracing::trace!("{} took {}ms", pjp.signature(), elapsed);
                    }
                    result
                }),
            )
            .build()
    }
}

/// 异常日志切面，记录后重新抛出
pub struct ExceptionLoggingAspect {
    pointcut: String,
}

impl ExceptionLoggingAspect {
    pub fn new(pointcut: impl Into<String>) -> Self {
        Self {
            pointcut: pointcut.into(),
        }
    }
}

impl Aspect for ExceptionLoggingAspect {
    fn name(&self) -> &str {
        "ExceptionLoggingAspect"
    }

    fn advisors(&self) -> AopResult<Vec<Advisor>> {
        AspectBuilder::new(self.name(), self.order())
            .advice(
                self.pointcut.clone(),
                Advice::after_throwing("ExceptionLoggingAspect::after_throwing", |jp, error| {
                    let info = ErrorInfo::from_anyhow(&error);
                    tracing::error!(
                        "❌ Exception in {}: {}",
                        jp.signature(),
                        info.full_description()
                    );
                    Err(error)
                }),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceType;

    #[test]
    fn test_builtin_aspects_produce_expected_advice_types() {
        let logging = LoggingAspect::new("*").with_args().advisors().unwrap();
        let types: Vec<AdviceType> = logging.iter().map(|a| a.advice().advice_type()).collect();
        assert_eq!(types, vec![AdviceType::Before, AdviceType::After]);

        let perf = PerformanceAspect::new(100, "*").advisors().unwrap();
        assert_eq!(perf[0].advice().advice_type(), AdviceType::Around);
        assert_eq!(perf[0].order(), LOWEST_PRECEDENCE);

        let errors = ExceptionLoggingAspect::new("*").advisors().unwrap();
        assert_eq!(errors[0].advice().advice_type(), AdviceType::AfterThrowing);
    }

    #[test]
    fn test_invalid_expression_fails_build() {
        assert!(LoggingAspect::new("execution(").advisors().is_err());
    }
}
