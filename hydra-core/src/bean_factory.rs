//! Bean Factory - 代理引擎所依赖的容器接口
//!
//! 代理引擎只需要容器提供少量查询能力：Bean 是否已定义、是否单例、
//! 所有定义声明的依赖，以及按名称/类型查找 Bean。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    bean::{BeanDefinition, BeanObject},
    bean_post_processor::BeanPostProcessor,
    error::{ContainerError, ContainerResult},
};

/// BeanFactory - 容器查询接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<Arc<dyn BeanObject>>;

    /// 通过类型名称获取 Bean（类型名可以是类名、父类名或接口名）
    fn get_bean_by_type(&self, type_name: &str) -> ContainerResult<Arc<dyn BeanObject>>;

    /// 检查是否包含指定名称的 Bean 实例
    fn contains_bean(&self, name: &str) -> bool;

    /// 检查是否包含指定的 Bean 定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    /// 获取所有 Bean 定义（按注册顺序）
    fn get_bean_definitions(&self) -> Vec<BeanDefinition>;

    /// 检查 Bean 是否为单例
    fn is_singleton(&self, name: &str) -> bool {
        self.get_bean_definition(name)
            .map(|definition| definition.is_singleton())
            .unwrap_or(false)
    }
}

/// DefaultBeanFactory - BeanFactory 的内存实现
///
/// 保存 Bean 定义与单例实例，并在注册实例时执行 BeanPostProcessor
pub struct DefaultBeanFactory {
    /// Bean 定义存储
    definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// Bean 定义注册顺序
    definition_names: RwLock<Vec<String>>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Arc<dyn BeanObject>>>,

    /// 提前暴露的单例引用（循环依赖）
    early_singletons: RwLock<HashMap<String, Arc<dyn BeanObject>>>,

    /// Bean 后置处理器列表（按优先级排序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl DefaultBeanFactory {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            definition_names: RwLock::new(Vec::new()),
            singletons: RwLock::new(HashMap::new()),
            early_singletons: RwLock::new(HashMap::new()),
            bean_post_processors: RwLock::new(Vec::new()),
        }
    }

    /// 注册 Bean 定义
    ///
    /// 定义与类型同时明确声明了不同的代理模式时视为配置错误
    pub fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()> {
        let name = definition.name.clone();

        tracing::trace!(
            "Attempting to register bean: name='{}', scope={:?}, proxy_mode={:?}",
            name,
            definition.scope,
            definition.proxy_mode
        );

        if let Some(class) = &definition.bean_class {
            let class_level = class.proxy_mode();
            if definition.proxy_mode.is_explicit()
                && class_level.is_explicit()
                && definition.proxy_mode != class_level
            {
                return Err(ContainerError::ConflictingProxyMode {
                    bean: name,
                    declared: definition.proxy_mode,
                    class_level,
                });
            }
        }

        {
            let mut definitions = self.definitions.write();
            if definitions.contains_key(&name) {
                tracing::warn!("Bean '{}' already exists, registration failed", name);
                return Err(ContainerError::BeanAlreadyExists(name));
            }
            definitions.insert(name.clone(), definition);
        }
        self.definition_names.write().push(name.clone());

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(())
    }

    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        tracing::debug!("Adding bean post processor: {}", processor.name());
        processors.push(processor);

        // 按优先级排序（order 值越小优先级越高）
        processors.sort_by_key(|p| p.order());
    }

    pub fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    /// 对实例执行所有后置处理器，不保存结果
    ///
    /// 原型 Bean 每次创建后都应经过这里
    pub fn initialize_bean(
        &self,
        name: &str,
        bean: Arc<dyn BeanObject>,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        let processors = self.get_bean_post_processors();

        let mut current = bean;
        for processor in &processors {
            current = processor.post_process_before_initialization(current, name)?;
        }
        for processor in &processors {
            current = processor.post_process_after_initialization(current, name)?;
        }
        Ok(current)
    }

    /// 注册单例实例，执行后置处理器后保存最终对象
    pub fn register_singleton(
        &self,
        name: &str,
        bean: Arc<dyn BeanObject>,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        let bean = self.initialize_bean(name, bean)?;
        self.early_singletons.write().remove(name);
        self.singletons
            .write()
            .insert(name.to_string(), Arc::clone(&bean));

        tracing::debug!("Singleton '{}' registered", name);
        Ok(bean)
    }

    /// 提前暴露单例引用
    pub fn get_early_bean_reference(
        &self,
        name: &str,
        bean: Arc<dyn BeanObject>,
    ) -> ContainerResult<Arc<dyn BeanObject>> {
        let mut current = bean;
        for processor in self.get_bean_post_processors() {
            current = processor.get_early_bean_reference(current, name)?;
        }
        self.early_singletons
            .write()
            .insert(name.to_string(), Arc::clone(&current));

        tracing::debug!("Early reference exposed for bean '{}'", name);
        Ok(current)
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }
}

impl Default for DefaultBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Arc<dyn BeanObject>> {
        if let Some(bean) = self.singletons.read().get(name) {
            return Ok(Arc::clone(bean));
        }
        self.early_singletons
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn get_bean_by_type(&self, type_name: &str) -> ContainerResult<Arc<dyn BeanObject>> {
        let singletons = self.singletons.read();
        let mut candidates: Vec<(&String, &Arc<dyn BeanObject>)> = singletons
            .iter()
            .filter(|(_, bean)| bean.bean_class().is_assignable_to(type_name))
            .collect();

        match candidates.len() {
            0 => Err(ContainerError::BeanNotFound(format!(
                "No bean of type '{}'",
                type_name
            ))),
            1 => Ok(Arc::clone(candidates[0].1)),
            _ => {
                candidates.sort_by(|a, b| a.0.cmp(b.0));
                let names: Vec<&str> = candidates.iter().map(|(name, _)| name.as_str()).collect();
                Err(ContainerError::Other(anyhow::anyhow!(
                    "Expected a single bean of type '{}' but found {}: {:?}",
                    type_name,
                    names.len(),
                    names
                )))
            }
        }
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name) || self.early_singletons.read().contains_key(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn get_bean_definitions(&self) -> Vec<BeanDefinition> {
        let definitions = self.definitions.read();
        self.definition_names
            .read()
            .iter()
            .filter_map(|name| definitions.get(name).cloned())
            .collect()
    }
}
