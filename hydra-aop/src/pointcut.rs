//! 切点（Pointcut）表达式系统
//!
//! 切点分两级匹配：
//! - 类型级：每个 Bean 创建代理时判断一次，只做粗筛，结果必须是方法级匹配的超集
//! - 方法级：每次调用时判断，可以访问参数

use hydra_core::{BeanClass, Method, Value};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::error::{AopError, AopResult};

/// 切点
pub trait Pointcut: Send + Sync + fmt::Debug {
    /// 类型级粗筛，返回 false 时该类型的任何方法都不会匹配
    fn matches_class(&self, bean_name: &str, class: &BeanClass) -> bool;

    /// 方法级精确匹配
    fn matches_method(&self, class: &BeanClass, method: &Method, args: &[Value]) -> bool;
}

pub type ArgsPredicate = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;
pub type MethodPredicate = Arc<dyn Fn(&BeanClass, &Method, &[Value]) -> bool + Send + Sync>;

/// 切点表达式
#[derive(Clone)]
pub enum PointcutExpression {
    /// 匹配所有方法
    All,

    /// 匹配类型（类名、父类名或接口名），例如 `*Service`
    TypePattern(String),

    /// 匹配方法名，例如 `get_*`
    MethodPattern(String),

    /// 同时匹配类型与方法名，对应 `execution(* UserService.get_user(..))`
    Execution {
        type_pattern: String,
        method_pattern: String,
    },

    /// 使用正则表达式匹配类型
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法名
    MethodRegex(Regex),

    /// 按调用参数匹配，类型级无法判断
    Args(ArgsPredicate),

    /// 自定义匹配函数，类型级无法判断
    Custom(MethodPredicate),

    And(Box<PointcutExpression>, Box<PointcutExpression>),

    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    pub fn args<F>(predicate: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        PointcutExpression::Args(Arc::new(predicate))
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&BeanClass, &Method, &[Value]) -> bool + Send + Sync + 'static,
    {
        PointcutExpression::Custom(Arc::new(predicate))
    }

    pub fn type_regex(pattern: &str) -> AopResult<Self> {
        Regex::new(pattern)
            .map(PointcutExpression::TypeRegex)
            .map_err(|e| invalid(pattern, e.to_string()))
    }

    pub fn method_regex(pattern: &str) -> AopResult<Self> {
        Regex::new(pattern)
            .map(PointcutExpression::MethodRegex)
            .map_err(|e| invalid(pattern, e.to_string()))
    }

    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }

    /// 解析切点表达式
    ///
    /// 支持的形式：
    /// - `*`
    /// - `execution(* UserService.get_user(..))`
    /// - `within(*Service)`
    /// - `* UserService.get_*(..)`（省略 execution）
    /// - 使用 `&&`、`||`、前缀 `!` 以及括号组合
    pub fn parse(expression: &str) -> AopResult<Self> {
        let mut parser = Parser::new(expression);
        let parsed = parser.parse_or()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(parsed)
    }

    /// 类型级判断：`Some(b)` 为确定结果，`None` 表示取决于具体方法或参数
    fn class_match(&self, class: &BeanClass) -> Option<bool> {
        match self {
            PointcutExpression::All => Some(true),
            PointcutExpression::TypePattern(pattern) => Some(type_matches(pattern, class)),
            PointcutExpression::TypeRegex(regex) => {
                Some(class.type_names().iter().any(|name| regex.is_match(name)))
            }
            PointcutExpression::MethodPattern(pattern) => {
                methods_match(class, |m| wildcard_match(pattern, m.name()))
            }
            PointcutExpression::MethodRegex(regex) => {
                methods_match(class, |m| regex.is_match(m.name()))
            }
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => {
                if !type_matches(type_pattern, class) {
                    return Some(false);
                }
                methods_match(class, |m| wildcard_match(method_pattern, m.name()))
            }
            PointcutExpression::Args(_) | PointcutExpression::Custom(_) => None,
            PointcutExpression::And(left, right) => {
                match (left.class_match(class), right.class_match(class)) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }
            }
            PointcutExpression::Or(left, right) => {
                match (left.class_match(class), right.class_match(class)) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }
            }
            PointcutExpression::Not(inner) => inner.class_match(class).map(|b| !b),
        }
    }

    fn method_match(&self, class: &BeanClass, method: &Method, args: &[Value]) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::TypePattern(pattern) => type_matches(pattern, class),
            PointcutExpression::TypeRegex(regex) => {
                class.type_names().iter().any(|name| regex.is_match(name))
            }
            PointcutExpression::MethodPattern(pattern) => wildcard_match(pattern, method.name()),
            PointcutExpression::MethodRegex(regex) => regex.is_match(method.name()),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => type_matches(type_pattern, class) && wildcard_match(method_pattern, method.name()),
            PointcutExpression::Args(predicate) => predicate(args),
            PointcutExpression::Custom(predicate) => predicate(class, method, args),
            PointcutExpression::And(left, right) => {
                left.method_match(class, method, args) && right.method_match(class, method, args)
            }
            PointcutExpression::Or(left, right) => {
                left.method_match(class, method, args) || right.method_match(class, method, args)
            }
            PointcutExpression::Not(inner) => !inner.method_match(class, method, args),
        }
    }
}

impl Pointcut for PointcutExpression {
    fn matches_class(&self, _bean_name: &str, class: &BeanClass) -> bool {
        self.class_match(class).unwrap_or(true)
    }

    fn matches_method(&self, class: &BeanClass, method: &Method, args: &[Value]) -> bool {
        self.method_match(class, method, args)
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "All"),
            PointcutExpression::TypePattern(p) => write!(f, "TypePattern({})", p),
            PointcutExpression::MethodPattern(p) => write!(f, "MethodPattern({})", p),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => write!(f, "Execution({}.{})", type_pattern, method_pattern),
            PointcutExpression::TypeRegex(r) => write!(f, "TypeRegex({})", r.as_str()),
            PointcutExpression::MethodRegex(r) => write!(f, "MethodRegex({})", r.as_str()),
            PointcutExpression::Args(_) => write!(f, "Args(..)"),
            PointcutExpression::Custom(_) => write!(f, "Custom(..)"),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

fn type_matches(pattern: &str, class: &BeanClass) -> bool {
    class
        .type_names()
        .iter()
        .any(|name| wildcard_match(pattern, name))
}

/// 所有方法都匹配为 `Some(true)`，都不匹配为 `Some(false)`，否则无法确定
fn methods_match(class: &BeanClass, matches: impl Fn(&Method) -> bool) -> Option<bool> {
    let methods = class.all_methods();
    let hits = methods.iter().filter(|m| matches(m)).count();
    if hits == 0 {
        Some(false)
    } else if hits == methods.len() {
        Some(true)
    } else {
        None
    }
}

/// `*` 通配符匹配，`*` 可以出现在任意位置
///
/// - `*` 匹配任意字符串
/// - `User*` 以 User 开头
/// - `*Service` 以 Service 结尾
/// - `get_*_by_id` 中间任意
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == text;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    // 最近一个 `*` 的位置，以及它当前吞掉的文本末尾
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, consumed)) = backtrack {
            p = star + 1;
            t = consumed + 1;
            backtrack = Some((star, consumed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

fn invalid(expression: &str, reason: impl Into<String>) -> AopError {
    AopError::InvalidPointcut {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

/// 递归下降解析器
///
/// or  := and ("||" and)*
/// and := unary ("&&" unary)*
/// unary := "!" unary | "(" or ")" | atom
struct Parser<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn error(&self, reason: &str) -> AopError {
        invalid(self.source, format!("{} at position {}", reason, self.pos))
    }

    fn parse_or(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_and()?;
        while self.eat("||") {
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_unary()?;
        while self.eat("&&") {
            expr = expr.and(self.parse_unary()?);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> AopResult<PointcutExpression> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.not());
        }
        if self.eat("(") {
            let expr = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(expr);
        }
        self.parse_atom()
    }

    /// 读取到顶层的 `&&`、`||` 或未配对的 `)` 为止
    fn parse_atom(&mut self) -> AopResult<PointcutExpression> {
        self.skip_whitespace();
        let rest = self.rest();
        let mut depth = 0usize;
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    end = i;
                    break;
                }
                ')' => depth -= 1,
                '&' | '|' if depth == 0 && (rest[i..].starts_with("&&") || rest[i..].starts_with("||")) => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(self.error("unbalanced parentheses"));
        }

        let atom = rest[..end].trim();
        if atom.is_empty() {
            return Err(self.error("expected a pointcut"));
        }
        self.pos += end;

        if atom == "*" {
            return Ok(PointcutExpression::All);
        }
        if let Some(inner) = wrapped(atom, "execution") {
            return self.parse_signature(inner);
        }
        if let Some(inner) = wrapped(atom, "within") {
            let type_pattern = inner.trim();
            if type_pattern.is_empty() || type_pattern.contains(char::is_whitespace) {
                return Err(self.error("within() expects a single type pattern"));
            }
            return Ok(PointcutExpression::TypePattern(type_pattern.to_string()));
        }
        self.parse_signature(atom)
    }

    /// `<ret> <Type>.<method>(..)`，返回类型可以省略
    fn parse_signature(&self, signature: &str) -> AopResult<PointcutExpression> {
        let parts: Vec<&str> = signature.split_whitespace().collect();
        let target = match parts.as_slice() {
            [target] => *target,
            [_return_type, target] => *target,
            _ => return Err(self.error("expected '<ret> <Type>.<method>(..)'")),
        };

        let Some(open) = target.find('(') else {
            return Err(self.error("missing parameter list"));
        };
        if !target.ends_with(')') {
            return Err(self.error("unterminated parameter list"));
        }
        let path = &target[..open];

        match path.rsplit_once('.') {
            Some((type_pattern, method_pattern))
                if !type_pattern.is_empty() && !method_pattern.is_empty() =>
            {
                Ok(PointcutExpression::Execution {
                    type_pattern: type_pattern.to_string(),
                    method_pattern: method_pattern.to_string(),
                })
            }
            Some(_) => Err(self.error("empty type or method pattern")),
            None if !path.is_empty() => Ok(PointcutExpression::MethodPattern(path.to_string())),
            None => Err(self.error("empty method pattern")),
        }
    }
}

/// `name(inner)` 形式时返回 inner
fn wrapped<'a>(atom: &'a str, name: &str) -> Option<&'a str> {
    atom.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}
