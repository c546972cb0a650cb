use std::{fs, path::Path, str::FromStr};

use log::{debug, trace, LevelFilter};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::{
        error::{REFERENCE_ERROR, TYPE_ERROR},
        ApiResult,
    },
};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    #[serde(default)]
    pub faults: Faults,

    #[validate(nested)]
    #[serde(default)]
    pub log: Log,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> ApiResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let conf_str = fs::read_to_string(path).map_err(|e| {
            config_error!("Unable to read conf file from {}: {}", path.display(), e)
        })?;
        debug!("Conf file read from {}", path.display());
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> ApiResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?;

        trace!("Loaded conf: {conf:?}");

        // use validator to validate conf file
        conf.validate()
            .map_err(|e| config_error!("Conf file valid failed: {}", e))?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> ApiResult<String> {
        serde_yaml::to_string(self).map_err(|e| config_error!("Unable to render conf: {}", e))
    }
}

/// Which hook failures count as programming faults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Faults::validate_kinds"))]
pub struct Faults {
    #[serde(default = "Faults::default_internal_kinds")]
    pub internal_kinds: Vec<String>,
    #[serde(default = "Faults::default_catch_panics")]
    pub catch_panics: bool,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            internal_kinds: Self::default_internal_kinds(),
            catch_panics: Self::default_catch_panics(),
        }
    }
}

impl Faults {
    fn default_internal_kinds() -> Vec<String> {
        vec![TYPE_ERROR.to_string(), REFERENCE_ERROR.to_string()]
    }

    fn default_catch_panics() -> bool {
        true
    }

    fn validate_kinds(&self) -> Result<(), ValidationError> {
        if self.internal_kinds.iter().any(|kind| kind.trim().is_empty()) {
            return Err(ValidationError::new("empty_internal_kind"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Log {
    #[serde(default = "Log::default_level")]
    #[validate(custom(function = "Log::validate_level"))]
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }

    fn validate_level(level: &String) -> Result<(), ValidationError> {
        match LevelFilter::from_str(level) {
            Ok(_) => Ok(()),
            Err(_) => {
                let mut err = ValidationError::new("invalid_log_level");
                err.add_param("level".into(), level);
                Err(err)
            }
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.level).unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_default_config() {
        init_log();
        let conf = Config::default();
        assert_eq!(conf.faults.internal_kinds, vec!["TypeError", "ReferenceError"]);
        assert!(conf.faults.catch_panics);
        assert_eq!(conf.log.level_filter(), LevelFilter::Info);
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        init_log();
        let conf_str = r#"
---
faults:
  internal_kinds:
    - TypeError
    - DatabaseError
  catch_panics: false

log:
  level: debug
        "#;
        let conf = Config::from_yaml(conf_str).unwrap();
        assert_eq!(conf.faults.internal_kinds, vec!["TypeError", "DatabaseError"]);
        assert!(!conf.faults.catch_panics);
        assert_eq!(conf.log.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        init_log();
        let conf = Config::from_yaml("{}").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn test_invalid_log_level() {
        init_log();
        let err = Config::from_yaml("log:\n  level: loud\n").unwrap_err();
        assert!(err.to_string().contains("Conf file valid failed"));
    }

    #[test]
    fn test_empty_internal_kind() {
        init_log();
        let err = Config::from_yaml("faults:\n  internal_kinds: [TypeError, ' ']\n").unwrap_err();
        assert!(err.to_string().contains("Conf file valid failed"));
    }

    #[test]
    fn test_yaml_round_trip() {
        init_log();
        let conf = Config::default();
        let rendered = conf.to_yaml().unwrap();
        assert_eq!(Config::from_yaml(&rendered).unwrap(), conf);
    }

    #[test]
    fn test_load_from_file() {
        init_log();
        let path =
            std::env::temp_dir().join(format!("serverless-api-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "log:\n  level: warn\n").unwrap();

        let conf = Config::load_from_yaml(&path).unwrap();
        assert_eq!(conf.log.level_filter(), LevelFilter::Warn);

        fs::remove_file(&path).unwrap();
        assert!(Config::load_from_yaml(&path).is_err());
    }
}
