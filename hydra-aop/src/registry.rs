//! 通知器注册表
//!
//! 装配阶段注册所有通知器，之后封存为只读；
//! 已创建的代理持有创建时匹配到的通知器快照

use hydra_core::BeanClass;
use std::sync::Arc;

use crate::advisor::Advisor;
use crate::aspect::{Aspect, AspectRegistration};
use crate::error::{AopError, AopResult};

pub struct AdvisorRegistry {
    advisors: Vec<Advisor>,
    sealed: bool,
}

impl AdvisorRegistry {
    pub fn new() -> Self {
        Self {
            advisors: Vec::new(),
            sealed: false,
        }
    }

    /// 注册通知器，注册顺序即相同 order 时的执行顺序
    pub fn register(&mut self, advisor: Advisor) -> AopResult<()> {
        let name = advisor.advice().name().to_string();
        if self.sealed {
            tracing::warn!("Advisor '{}' rejected: registry is sealed", name);
            return Err(AopError::RegistrySealed(name));
        }
        if name.trim().is_empty() {
            return Err(AopError::InvalidAdvice {
                advice: name,
                reason: "advice name must not be empty".to_string(),
            });
        }

        tracing::debug!("Registering advisor '{}' (order {})", name, advisor.order());
        self.advisors.push(advisor);
        Ok(())
    }

    /// 注册切面产生的所有通知器
    pub fn register_aspect(&mut self, aspect: &dyn Aspect) -> AopResult<()> {
        let advisors = aspect.advisors()?;
        tracing::debug!(
            "Registering aspect '{}' with {} advisor(s)",
            aspect.name(),
            advisors.len()
        );
        for advisor in advisors {
            self.register(advisor)?;
        }
        Ok(())
    }

    /// 加载所有通过 `inventory::submit!` 提交的切面
    pub fn auto_load_aspects(&mut self) -> AopResult<usize> {
        let registrations: Vec<&AspectRegistration> =
            crate::aspect::get_all_aspect_registrations().collect();
        tracing::info!("Auto-loading {} aspect(s) from registry", registrations.len());

        let before = self.advisors.len();
        for registration in registrations {
            tracing::debug!("  ├─ Loading aspect: {}", registration.name);
            let aspect: Arc<dyn Aspect> = registration.create_instance();
            self.register_aspect(aspect.as_ref())?;
        }
        Ok(self.advisors.len() - before)
    }

    /// 封存，之后的注册都会失败
    pub fn seal(&mut self) {
        if !self.sealed {
            tracing::debug!("Advisor registry sealed with {} advisor(s)", self.advisors.len());
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn advisors(&self) -> &[Advisor] {
        &self.advisors
    }

    /// 类型级匹配的通知器，按 order 稳定排序
    pub fn matching_advisors(&self, bean_name: &str, class: &BeanClass) -> Vec<Advisor> {
        let mut matched: Vec<Advisor> = self
            .advisors
            .iter()
            .filter(|advisor| advisor.pointcut().matches_class(bean_name, class))
            .cloned()
            .collect();
        matched.sort_by_key(Advisor::order);
        matched
    }

    pub fn len(&self) -> usize {
        self.advisors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisors.is_empty()
    }
}

impl Default for AdvisorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
