use std::fmt;
use std::sync::Arc;

use crate::advice::Advice;
use crate::error::AopResult;
use crate::pointcut::{Pointcut, PointcutExpression};

/// 切点与通知的组合，注册后不可变
#[derive(Clone)]
pub struct Advisor {
    pointcut: Arc<dyn Pointcut>,
    advice: Advice,
}

impl Advisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        Self { pointcut, advice }
    }

    /// 由切点表达式字符串创建
    pub fn from_expression(expression: &str, advice: Advice) -> AopResult<Self> {
        let pointcut = PointcutExpression::parse(expression)?;
        Ok(Self::new(Arc::new(pointcut), advice))
    }

    pub fn pointcut(&self) -> &Arc<dyn Pointcut> {
        &self.pointcut
    }

    pub fn advice(&self) -> &Advice {
        &self.advice
    }

    pub fn order(&self) -> i32 {
        self.advice.order()
    }
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advisor")
            .field("pointcut", &self.pointcut)
            .field("advice", &self.advice)
            .finish()
    }
}
