use std::sync::LazyLock;

use hashbrown::HashMap;
use planscope_error::{ExplainError, Result};

use crate::catalog::DEFAULT_DATABASE;
use crate::plan::ScalarValue;

pub const DEFAULT_SESSION_USER: &str = "planscope";

/// Configuration for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub enable_cbo: bool,
    pub enable_optimizer: bool,
    pub enable_whole_stage_codegen: bool,
    pub default_database: String,
    pub session_user: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            enable_cbo: false,
            enable_optimizer: true,
            enable_whole_stage_codegen: true,
            default_database: DEFAULT_DATABASE.to_string(),
            session_user: DEFAULT_SESSION_USER.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = lookup_setting(name)?;
        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = lookup_setting(name)?;
        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let func = lookup_setting(name)?;
        let scalar = (func.get)(&def_conf);
        (func.set)(scalar, self)
    }
}

fn lookup_setting(name: &str) -> Result<&'static SettingFunctions> {
    GET_SET_FUNCTIONS
        .get(name)
        .ok_or_else(|| ExplainError::analysis(format!("Missing setting for '{name}'")))
}

struct SettingFunctions {
    set: fn(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<EnableCbo>(&mut map);
    insert_setting::<EnableOptimizer>(&mut map);
    insert_setting::<EnableWholeStageCodegen>(&mut map);
    insert_setting::<DefaultDatabase>(&mut map);
    insert_setting::<SessionUser>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue;
}

pub struct EnableCbo;

impl SessionSetting for EnableCbo {
    const NAME: &'static str = "enable_cbo";
    const DESCRIPTION: &'static str = "Use collected statistics, shows row counts in cost output";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.enable_cbo = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.enable_cbo.into()
    }
}

pub struct EnableOptimizer;

impl SessionSetting for EnableOptimizer {
    const NAME: &'static str = "enable_optimizer";
    const DESCRIPTION: &'static str = "Controls if the optimizer is enabled";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.enable_optimizer = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.enable_optimizer.into()
    }
}

pub struct EnableWholeStageCodegen;

impl SessionSetting for EnableWholeStageCodegen {
    const NAME: &'static str = "enable_whole_stage_codegen";
    const DESCRIPTION: &'static str = "Fuse physical operators into generated stages";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.enable_whole_stage_codegen = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.enable_whole_stage_codegen.into()
    }
}

pub struct DefaultDatabase;

impl SessionSetting for DefaultDatabase {
    const NAME: &'static str = "default_database";
    const DESCRIPTION: &'static str = "Database used to resolve unqualified table names";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_into_string()?;
        if val.is_empty() {
            return Err(ExplainError::analysis("Default database cannot be empty"));
        }
        conf.default_database = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.default_database.clone().into()
    }
}

pub struct SessionUser;

impl SessionSetting for SessionUser {
    const NAME: &'static str = "session_user";
    const DESCRIPTION: &'static str = "User recorded as the owner of created tables";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        conf.session_user = scalar.try_into_string()?;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.session_user.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_setting_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("enable_cbo", true.into()).unwrap();

        let val = conf.get_as_scalar("enable_cbo").unwrap();
        assert!(val.try_as_bool().unwrap());
    }

    #[test]
    fn set_setting_not_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("hell_world", 58.into()).unwrap_err();
    }

    #[test]
    fn set_wrong_type() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("enable_optimizer", 1.into()).unwrap_err();
        assert!(conf.enable_optimizer);
    }

    #[test]
    fn reset_restores_default() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("default_database", "sales".into()).unwrap();
        assert_eq!("sales", conf.default_database);

        conf.reset("default_database").unwrap();
        assert_eq!(DEFAULT_DATABASE, conf.default_database);
    }

    #[test]
    fn set_bool_from_string() {
        let mut conf = SessionConfig::default();
        conf.set_from_scalar("enable_whole_stage_codegen", "false".into())
            .unwrap();
        assert!(!conf.enable_whole_stage_codegen);
    }
}
