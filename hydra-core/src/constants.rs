//! 配置键与排序常量

/// 是否启用 AOP 代理
pub const AOP_ENABLED_KEY: &str = "hydra.aop.enabled";

/// 是否对所有 Bean 强制使用子类代理
pub const AOP_PROXY_TARGET_CLASS_KEY: &str = "hydra.aop.proxy-target-class";

pub const LOGGING_LEVEL_KEY: &str = "logging.level";
pub const LOGGING_FORMAT_KEY: &str = "logging.format";
pub const LOGGING_FILTER_KEY: &str = "logging.filter";

/// 最低优先级，未声明顺序的通知使用此值
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
