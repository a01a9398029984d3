use crate::error::{Error, Result};
use crate::planner::DEFAULT_SEARCH_ENGINE;
use crate::types::Risk;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

const APP_NAME: &str = "orion";
const PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub engine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub risk_threshold: String,
    pub auto_approve: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub shell: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub safety: SafetyConfig,
    pub exec: ExecConfig,
    pub planner: PlannerConfig,
    /// Application name → bundle or binary path.
    pub apps: BTreeMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_SEARCH_ENGINE.to_string(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            risk_threshold: "medium".to_string(),
            auto_approve: false,
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Config {
    pub fn threshold(&self) -> Risk {
        Risk::parse_lenient(&self.safety.risk_threshold)
    }

    /// Search URL template; empty means the default.
    pub fn search_template(&self) -> Result<&str> {
        let engine = self.search.engine.trim();
        if engine.is_empty() {
            return Ok(DEFAULT_SEARCH_ENGINE);
        }
        check_template(engine)?;
        Ok(engine)
    }

    pub fn planner_command(&self) -> Option<&str> {
        self.planner
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        Ok((lookup(key)?.get)(self))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (lookup(key)?.set)(self, value.trim())
    }
}

fn check_template(engine: &str) -> Result<()> {
    match engine.matches(PLACEHOLDER).count() {
        1 => Ok(()),
        n => Err(Error::Config(format!(
            "search engine template must contain exactly one {} (found {})",
            PLACEHOLDER, n
        ))),
    }
}

/// A string-addressable setting.
pub struct ConfigKey {
    pub name: &'static str,
    pub get: fn(&Config) -> String,
    pub set: fn(&mut Config, &str) -> Result<()>,
}

pub const CONFIG_KEYS: &[ConfigKey] = &[
    ConfigKey {
        name: "search.engine",
        get: |c| c.search.engine.clone(),
        set: |c, v| {
            if !v.is_empty() {
                check_template(v)?;
            }
            c.search.engine = v.to_string();
            Ok(())
        },
    },
    ConfigKey {
        name: "safety.risk_threshold",
        get: |c| c.safety.risk_threshold.clone(),
        set: |c, v| {
            let risk: Risk = v.parse().map_err(Error::Config)?;
            c.safety.risk_threshold = risk.to_string();
            Ok(())
        },
    },
    ConfigKey {
        name: "safety.auto_approve",
        get: |c| c.safety.auto_approve.to_string(),
        set: |c, v| {
            c.safety.auto_approve = v
                .parse()
                .map_err(|_| Error::Config(format!("expected true or false, got {:?}", v)))?;
            Ok(())
        },
    },
    ConfigKey {
        name: "exec.shell",
        get: |c| c.exec.shell.clone(),
        set: |c, v| {
            if v.is_empty() {
                return Err(Error::Config("shell cannot be empty".into()));
            }
            c.exec.shell = v.to_string();
            Ok(())
        },
    },
    ConfigKey {
        name: "planner.command",
        get: |c| c.planner.command.clone().unwrap_or_default(),
        set: |c, v| {
            c.planner.command = (!v.is_empty()).then(|| v.to_string());
            Ok(())
        },
    },
];

fn lookup(key: &str) -> Result<&'static ConfigKey> {
    CONFIG_KEYS
        .iter()
        .find(|k| k.name == key)
        .ok_or_else(|| Error::Config(format!("unknown key: {}", key)))
}

fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

pub fn get_shortcuts_path() -> PathBuf {
    get_config_dir().join("shortcuts.toml")
}

pub fn get_history_path() -> PathBuf {
    get_data_dir().join("history.db")
}

pub fn get_logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

pub fn load_config() -> Config {
    let path = get_config_path();
    if !path.exists() {
        return Config::default();
    }
    match fs::read_to_string(&path)
        .map_err(Error::from)
        .and_then(|content| toml::from_str(&content).map_err(Error::from))
    {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = get_config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
