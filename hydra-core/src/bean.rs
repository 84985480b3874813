//! 运行时类型模型与 Bean 元数据
//!
//! Rust 没有运行时反射，因此类、方法、接口等信息需要显式描述。
//! 代理引擎只依赖这里定义的元数据来判断代理方式、匹配切点以及分派方法调用。

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::bean_factory::BeanFactory;
use crate::error::ContainerError;
use crate::Scope;

/// 方法参数与返回值的统一表示
pub type Value = Arc<dyn Any + Send + Sync>;

/// 方法参数列表
pub type Args = Vec<Value>;

/// 方法调用结果，`None` 表示无返回值（null / unit）
pub type InvocationResult = anyhow::Result<Option<Value>>;

/// 包装一个值
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// 按类型读取第 `index` 个参数
pub fn arg_ref<T: Any>(args: &[Value], index: usize) -> anyhow::Result<&T> {
    args.get(index)
        .and_then(|v| v.downcast_ref::<T>())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "argument {} is missing or not a {}",
                index,
                std::any::type_name::<T>()
            )
        })
}

/// 代理模式（Bean 定义或类型上声明）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyMode {
    /// 未明确指定，由策略选择器自动推导
    #[default]
    Auto,
    /// 不接受代理
    No,
    /// 只使用接口代理
    Interfaces,
    /// 只使用子类代理
    Subclass,
    /// 子类代理，并支持自调用（this 调用）也经过通知链
    SupportNested,
}

impl ProxyMode {
    /// 是否为明确指定的模式
    pub fn is_explicit(&self) -> bool {
        !matches!(self, ProxyMode::Auto)
    }
}

impl FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ProxyMode::Auto),
            "no" | "none" => Ok(ProxyMode::No),
            "interfaces" => Ok(ProxyMode::Interfaces),
            "subclass" | "target-class" => Ok(ProxyMode::Subclass),
            "support-nested" | "nested" => Ok(ProxyMode::SupportNested),
            _ => Err(format!("Invalid proxy mode: {}", s)),
        }
    }
}

/// 代理机制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyMechanism {
    /// 接口分派：生成的代理类型实现目标的所有接口
    Interfaces,
    /// 子类分派：生成的代理类型继承目标的具体类型
    Subclass,
}

/// 方法元数据
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    name: String,
    declaring_type: String,
    declaring_interface: Option<String>,
    overridable: bool,
}

impl Method {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.into(),
            declaring_interface: None,
            overridable: true,
        }
    }

    /// 标记该方法由某个接口声明
    pub fn from_interface(mut self, interface: impl Into<String>) -> Self {
        self.declaring_interface = Some(interface.into());
        self
    }

    /// 标记为不可重写（子类代理不会拦截）
    pub fn non_overridable(mut self) -> Self {
        self.overridable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn declaring_interface(&self) -> Option<&str> {
        self.declaring_interface.as_deref()
    }

    pub fn is_overridable(&self) -> bool {
        self.overridable
    }

    /// 方法签名，例如 `OrderService::place_order`
    pub fn signature(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 壳实例构造函数
///
/// 子类代理需要构造一个"父类部分"的实例，构造时可以从容器中解析依赖
pub type ShellConstructor =
    Arc<dyn Fn(&dyn BeanFactory) -> anyhow::Result<Box<dyn BeanObject>> + Send + Sync>;

/// 类型元数据
pub struct BeanClass {
    name: String,
    interfaces: Vec<String>,
    superclass: Option<Arc<BeanClass>>,
    methods: Vec<Method>,
    is_final: bool,
    proxy_mode: ProxyMode,
    proxy_origin: Option<ProxyMechanism>,
    constructor: Option<ShellConstructor>,
}

impl BeanClass {
    pub fn builder(name: impl Into<String>) -> BeanClassBuilder {
        BeanClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 直接实现的接口
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn superclass(&self) -> Option<&Arc<BeanClass>> {
        self.superclass.as_ref()
    }

    /// 本类型声明的方法（不含继承）
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// 类型级别声明的代理模式
    pub fn proxy_mode(&self) -> ProxyMode {
        self.proxy_mode
    }

    /// 如果是框架生成的代理类型，返回生成它的代理机制
    pub fn proxy_origin(&self) -> Option<ProxyMechanism> {
        self.proxy_origin
    }

    pub fn is_proxy_class(&self) -> bool {
        self.proxy_origin.is_some()
    }

    pub fn constructor(&self) -> Option<&ShellConstructor> {
        self.constructor.as_ref()
    }

    /// 所有祖先类型（由近及远）
    pub fn ancestors(&self) -> impl Iterator<Item = &BeanClass> {
        std::iter::successors(self.superclass.as_deref(), |c| c.superclass.as_deref())
    }

    /// 查找方法，先查本类型再沿继承链向上
    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name)
            .or_else(|| self.superclass.as_ref()?.find_method(name))
    }

    /// 所有可见方法，子类声明的同名方法覆盖父类方法
    pub fn all_methods(&self) -> Vec<Method> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for class in std::iter::once(self).chain(self.ancestors()) {
            for method in &class.methods {
                if seen.insert(method.name.clone()) {
                    methods.push(method.clone());
                }
            }
        }
        methods
    }

    /// 所有实现的接口（含继承），去重并保持声明顺序
    pub fn all_interfaces(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(self)
            .chain(self.ancestors())
            .flat_map(|c| c.interfaces.iter())
            .filter(|name| seen.insert(name.to_string()))
            .cloned()
            .collect()
    }

    /// 本类型、所有父类型与所有接口的名称
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::iter::once(self)
            .chain(self.ancestors())
            .map(|c| c.name.clone())
            .collect();
        names.extend(self.all_interfaces());
        names
    }

    pub fn is_assignable_to(&self, type_name: &str) -> bool {
        self.type_names().iter().any(|n| n == type_name)
    }

    /// 跳过框架生成的子类代理，返回用户定义的类型
    pub fn user_class(self: &Arc<Self>) -> Arc<BeanClass> {
        let mut current = Arc::clone(self);
        while current.proxy_origin == Some(ProxyMechanism::Subclass) {
            let parent = match current.superclass.as_ref() {
                Some(parent) => Arc::clone(parent),
                None => break,
            };
            current = parent;
        }
        current
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .field("methods", &self.methods.len())
            .field("is_final", &self.is_final)
            .field("proxy_mode", &self.proxy_mode)
            .field("proxy_origin", &self.proxy_origin)
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}

impl PartialEq for BeanClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BeanClass {}

/// BeanClass 构建器
pub struct BeanClassBuilder {
    name: String,
    interfaces: Vec<String>,
    superclass: Option<Arc<BeanClass>>,
    methods: Vec<Method>,
    is_final: bool,
    proxy_mode: ProxyMode,
    proxy_origin: Option<ProxyMechanism>,
    constructor: Option<ShellConstructor>,
}

impl BeanClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
            superclass: None,
            methods: Vec::new(),
            is_final: false,
            proxy_mode: ProxyMode::Auto,
            proxy_origin: None,
            constructor: None,
        }
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        let interface = interface.into();
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }

    pub fn extends(mut self, superclass: Arc<BeanClass>) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// 声明一个可重写的方法
    pub fn method(mut self, name: impl Into<String>) -> Self {
        let method = Method::new(self.name.clone(), name);
        self.methods.push(method);
        self
    }

    /// 声明一个由接口定义的方法，接口会一并加入实现列表
    pub fn interface_method(self, interface: impl Into<String>, name: impl Into<String>) -> Self {
        let interface = interface.into();
        let method = Method::new(self.name.clone(), name).from_interface(interface.clone());
        self.implements(interface).with_method(method)
    }

    /// 声明一个不可重写的方法
    pub fn final_method(mut self, name: impl Into<String>) -> Self {
        let method = Method::new(self.name.clone(), name).non_overridable();
        self.methods.push(method);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn proxy_mode(mut self, mode: ProxyMode) -> Self {
        self.proxy_mode = mode;
        self
    }

    pub fn proxy_origin(mut self, mechanism: ProxyMechanism) -> Self {
        self.proxy_origin = Some(mechanism);
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&dyn BeanFactory) -> anyhow::Result<Box<dyn BeanObject>> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    pub fn build(self) -> Arc<BeanClass> {
        Arc::new(BeanClass {
            name: self.name,
            interfaces: self.interfaces,
            superclass: self.superclass,
            methods: self.methods,
            is_final: self.is_final,
            proxy_mode: self.proxy_mode,
            proxy_origin: self.proxy_origin,
            constructor: self.constructor,
        })
    }
}

/// 可被代理的对象
///
/// `dispatch` 相当于反射调用：根据方法元数据执行真实逻辑。
/// `this` 是自调用应当经过的接收者，实现中调用自身其他方法时应使用
/// `this.invoke(..)`，这样在支持嵌套代理时自调用也会被拦截。
pub trait BeanObject: Any + Send + Sync + 'static {
    /// 运行时类型
    fn bean_class(&self) -> Arc<BeanClass>;

    /// 执行方法
    fn dispatch(&self, this: &dyn BeanObject, method: &Method, args: Args) -> InvocationResult;

    /// 从另一个实例复制状态
    ///
    /// 子类代理创建壳实例后调用一次，把目标实例的可变状态复制过来
    fn transfer_state(&mut self, _source: &dyn BeanObject) {}

    /// 是否为切面相关对象（切面对象永远不会被代理）
    fn is_advisor(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn BeanObject {
    /// 按名称调用方法，`this` 为自身
    pub fn invoke(&self, method_name: &str, args: Args) -> InvocationResult {
        let class = self.bean_class();
        let method = class.find_method(method_name).cloned().ok_or_else(|| {
            ContainerError::NoSuchMethod {
                class: class.name().to_string(),
                method: method_name.to_string(),
            }
        })?;
        self.dispatch(self, &method, args)
    }

    pub fn downcast_ref<T: BeanObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// 依赖声明中引用的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Interface,
    Class,
    /// 基础类型（数字、字符串等），不参与代理方式推导
    Simple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    name: String,
    kind: TypeKind,
}

impl TypeRef {
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
        }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Simple,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }
}

/// 依赖注入点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    Field,
    Setter,
    Constructor,
    FactoryMethod,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    /// 按 Bean 名称引用
    ByName(String),
    /// 按类型引用
    ByType(TypeRef),
}

/// 一条直接依赖声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    pub injection_point: InjectionPoint,
    pub target: DependencyTarget,
}

impl DependencyRef {
    pub fn by_type(injection_point: InjectionPoint, type_ref: TypeRef) -> Self {
        Self {
            injection_point,
            target: DependencyTarget::ByType(type_ref),
        }
    }

    pub fn by_name(injection_point: InjectionPoint, bean_name: impl Into<String>) -> Self {
        Self {
            injection_point,
            target: DependencyTarget::ByName(bean_name.into()),
        }
    }
}

/// Bean 定义 - 描述 Bean 的作用域、代理模式与依赖
#[derive(Clone)]
pub struct BeanDefinition {
    /// Bean 的名称
    pub name: String,

    /// Bean 的作用域
    pub scope: Scope,

    /// 定义上声明的代理模式（优先于类型上的声明）
    pub proxy_mode: ProxyMode,

    /// Bean 的类型
    pub bean_class: Option<Arc<BeanClass>>,

    /// 直接依赖（字段、Setter、构造函数、工厂方法）
    pub dependencies: Vec<DependencyRef>,
}

impl BeanDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Scope::default(),
            proxy_mode: ProxyMode::Auto,
            bean_class: None,
            dependencies: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_proxy_mode(mut self, proxy_mode: ProxyMode) -> Self {
        self.proxy_mode = proxy_mode;
        self
    }

    pub fn with_class(mut self, bean_class: Arc<BeanClass>) -> Self {
        self.bean_class = Some(bean_class);
        self
    }

    pub fn with_dependency(mut self, dependency: DependencyRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyRef>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("proxy_mode", &self.proxy_mode)
            .field("bean_class", &self.bean_class.as_ref().map(|c| c.name()))
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_class() -> Arc<BeanClass> {
        BeanClass::builder("BaseRepository")
            .implements("Repository")
            .method("find")
            .method("save")
            .build()
    }

    #[test]
    fn test_method_lookup_walks_superclass() {
        let class = BeanClass::builder("UserRepository")
            .extends(base_class())
            .method("save")
            .build();

        let save = class.find_method("save").unwrap();
        assert_eq!(save.declaring_type(), "UserRepository");

        let find = class.find_method("find").unwrap();
        assert_eq!(find.declaring_type(), "BaseRepository");

        assert!(class.find_method("delete").is_none());
        assert_eq!(class.all_methods().len(), 2);
    }

    #[test]
    fn test_interfaces_and_type_names() {
        let class = BeanClass::builder("UserRepository")
            .extends(base_class())
            .interface_method("Auditable", "audit")
            .build();

        assert_eq!(class.interfaces(), &["Auditable".to_string()]);
        assert_eq!(
            class.all_interfaces(),
            vec!["Auditable".to_string(), "Repository".to_string()]
        );
        assert!(class.is_assignable_to("BaseRepository"));
        assert!(class.is_assignable_to("Repository"));
        assert!(!class.is_assignable_to("OrderRepository"));
    }

    #[test]
    fn test_user_class_skips_generated_subclass() {
        let user = base_class();
        let generated = BeanClass::builder("BaseRepository$$Proxy")
            .extends(Arc::clone(&user))
            .proxy_origin(ProxyMechanism::Subclass)
            .build();

        assert_eq!(generated.user_class().name(), "BaseRepository");
        assert_eq!(user.user_class().name(), "BaseRepository");
    }

    #[test]
    fn test_arg_ref() {
        let args: Args = vec![value(7_i64), value("x".to_string())];
        assert_eq!(*arg_ref::<i64>(&args, 0).unwrap(), 7);
        assert_eq!(arg_ref::<String>(&args, 1).unwrap(), "x");
        assert!(arg_ref::<i64>(&args, 1).is_err());
        assert!(arg_ref::<i64>(&args, 5).is_err());
    }

    #[test]
    fn test_proxy_mode_parsing() {
        assert_eq!("interfaces".parse::<ProxyMode>().unwrap(), ProxyMode::Interfaces);
        assert_eq!("target-class".parse::<ProxyMode>().unwrap(), ProxyMode::Subclass);
        assert_eq!("support-nested".parse::<ProxyMode>().unwrap(), ProxyMode::SupportNested);
        assert!("sideways".parse::<ProxyMode>().is_err());
        assert!(!ProxyMode::Auto.is_explicit());
        assert!(ProxyMode::No.is_explicit());
    }
}
