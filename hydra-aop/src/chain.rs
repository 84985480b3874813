//! 通知链调用
//!
//! 一次方法调用对应一个 `AdviceChainInvocation`，游标从 0 开始，
//! 每个通知按自身类型决定如何继续调用 `proceed()`，最后一环调用真实方法

use hydra_core::{Args, BeanClass, BeanObject, InvocationResult, Method, Value};
use std::sync::Arc;

use crate::advice::{Advice, AdviceKind};
use crate::advisor::Advisor;
use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};

/// 子类代理的父类调用句柄
///
/// 持有代理内部的壳实例，调用时以代理作为 `this`，
/// 这样方法内部的自调用会重新经过代理
#[derive(Clone, Copy)]
pub struct SuperMethod<'a> {
    shell: &'a dyn BeanObject,
}

impl<'a> SuperMethod<'a> {
    pub fn new(shell: &'a dyn BeanObject) -> Self {
        Self { shell }
    }

    pub fn invoke_super(&self, proxy: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult {
        self.shell.dispatch(proxy, method, args)
    }
}

/// 按切点的方法级匹配过滤通知，保持已排好的顺序
pub fn resolve_advices(
    class: &BeanClass,
    method: &Method,
    args: &[Value],
    advisors: &[Advisor],
) -> Vec<Advice> {
    advisors
        .iter()
        .filter(|advisor| advisor.pointcut().matches_method(class, method, args))
        .map(|advisor| advisor.advice().clone())
        .collect()
}

/// 单次调用的通知链状态，只属于发起调用的线程
pub struct AdviceChainInvocation<'a> {
    join_point: JoinPoint<'a>,
    advices: Vec<Advice>,
    cursor: usize,
    super_method: Option<SuperMethod<'a>>,
}

impl<'a> AdviceChainInvocation<'a> {
    pub fn new(
        join_point: JoinPoint<'a>,
        advices: Vec<Advice>,
        super_method: Option<SuperMethod<'a>>,
    ) -> Self {
        Self {
            join_point,
            advices,
            cursor: 0,
            super_method,
        }
    }

    pub fn join_point(&self) -> &JoinPoint<'a> {
        &self.join_point
    }

    pub fn join_point_mut(&mut self) -> &mut JoinPoint<'a> {
        &mut self.join_point
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn reset_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// 执行下一个通知，通知链走完后调用真实方法
    pub fn proceed(&mut self) -> InvocationResult {
        if self.cursor >= self.advices.len() {
            return self.invoke_join_point();
        }
        let advice = &self.advices[self.cursor];
        let kind = advice.kind().clone();
        tracing::trace!(
            "Advice '{}' ({:?}) at position {} for {}",
            advice.name(),
            advice.advice_type(),
            self.cursor,
            self.join_point.signature()
        );
        self.cursor += 1;

        match kind {
            AdviceKind::Before(advice) => {
                advice.before(&mut self.join_point)?;
                self.proceed()
            }
            AdviceKind::AfterReturning(advice) => {
                let result = self.proceed()?;
                advice.after_returning(&self.join_point, result.as_ref())?;
                Ok(result)
            }
            AdviceKind::AfterThrowing(advice) => match self.proceed() {
                Ok(result) => Ok(result),
                Err(error) => {
                    // 通知未返回错误即视为已处理
                    advice.after_throwing(&self.join_point, error)?;
                    Ok(None)
                }
            },
            AdviceKind::After(advice) => {
                let outcome = self.proceed();
                advice.after(&self.join_point)?;
                outcome
            }
            AdviceKind::Around(advice) => advice.around(ProceedingJoinPoint::new(self)),
        }
    }

    fn invoke_join_point(&mut self) -> InvocationResult {
        let args = self.join_point.args_snapshot();
        let method = self.join_point.method();
        match self.super_method {
            Some(super_method) => super_method.invoke_super(self.join_point.proxy(), method, args),
            None => {
                let target = Arc::clone(self.join_point.target());
                target.dispatch(target.as_ref(), method, args)
            }
        }
    }
}
