use hydra_core::{
    ContainerError, ContainerResult, Environment, AOP_ENABLED_KEY, AOP_PROXY_TARGET_CLASS_KEY,
};
use serde::Deserialize;

/// AOP 配置（`hydra.aop.*`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AopProperties {
    /// 是否启用自动代理，默认开启
    pub enabled: bool,

    /// 是否对所有 Bean 强制使用子类代理
    pub proxy_target_class: bool,
}

impl Default for AopProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            proxy_target_class: false,
        }
    }
}

impl AopProperties {
    pub fn from_environment(env: &Environment) -> ContainerResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: flag(env, AOP_ENABLED_KEY, defaults.enabled)?,
            proxy_target_class: flag(env, AOP_PROXY_TARGET_CLASS_KEY, defaults.proxy_target_class)?,
        })
    }
}

fn flag(env: &Environment, key: &str, default: bool) -> ContainerResult<bool> {
    match env.get(key) {
        None => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| {
            ContainerError::ConfigLoadFailed(format!("Invalid boolean '{}' for '{}'", value, key))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::{ConfigValue, MapPropertySource, TomlPropertySource};

    #[test]
    fn test_defaults_without_configuration() {
        let env = Environment::new();
        assert_eq!(AopProperties::from_environment(&env).unwrap(), AopProperties::default());
    }

    #[test]
    fn test_from_toml_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            TomlPropertySource::from_str(
                "[hydra.aop]\nenabled = false\nproxy-target-class = true\n",
                "application.toml",
            )
            .unwrap(),
        ));

        let props = AopProperties::from_environment(&env).unwrap();
        assert!(!props.enabled);
        assert!(props.proxy_target_class);
    }

    #[test]
    fn test_invalid_flag_is_an_error() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test").with(AOP_ENABLED_KEY, ConfigValue::String("maybe".into())),
        ));
        assert!(AopProperties::from_environment(&env).is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let props: AopProperties = toml::from_str("proxy-target-class = true").unwrap();
        assert!(props.enabled);
        assert!(props.proxy_target_class);
    }
}
