use crate::catalog::{ActionDefinition, Catalog};
use crate::command::CommandTemplate;
use crate::error::{Result, SwitchboardError};
use crate::paths;
use crate::runner::{SystemRunner, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RunnerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Working directory for spawned commands. Relative paths resolve
    /// against the project root; unset means the project root itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            working_dir: None,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the process runner this configuration describes.
    pub fn build_runner(&self, root: &Path) -> SystemRunner {
        let dir = match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };
        SystemRunner::new(self.timeout()).with_working_dir(dir)
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionEntry
// ---------------------------------------------------------------------------

/// One catalog entry as written in the config file: the definition plus the
/// optional command it maps to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    #[serde(flatten)]
    pub definition: ActionDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandTemplate>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            runner: RunnerConfig::default(),
            server: ServerConfig::default(),
            actions: Vec::new(),
        }
    }
}

impl Config {
    /// The scaffold written by `switchboard init`: a single `ping` action.
    pub fn starter() -> Self {
        Self {
            actions: vec![ActionEntry {
                definition: ActionDefinition::new("ping", "Liveness probe: prints pong"),
                command: Some(CommandTemplate::new("echo").arg("pong")),
            }],
            ..Self::default()
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SwitchboardError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Build the read-only catalog, failing on duplicate names or bad schemas.
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::new(
            self.actions
                .iter()
                .map(|entry| entry.definition.clone())
                .collect(),
        )
    }

    /// The per-action command lookup table. Unmapped actions are absent.
    pub fn commands(&self) -> HashMap<String, CommandTemplate> {
        self.actions
            .iter()
            .filter_map(|entry| {
                entry
                    .command
                    .clone()
                    .map(|cmd| (entry.definition.name.clone(), cmd))
            })
            .collect()
    }

    /// Non-fatal findings plus errors that would make the service misbehave.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = self.catalog() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        if self.runner.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "runner.timeout_secs must be greater than zero".into(),
            });
        }

        if self.actions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no actions are defined".into(),
            });
        }

        for entry in &self.actions {
            let name = &entry.definition.name;
            match &entry.command {
                None => warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("action '{name}' has no command; triggering it will fail"),
                }),
                Some(cmd) if cmd.program.trim().is_empty() => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("action '{name}' has an empty command program"),
                }),
                Some(cmd) => {
                    let is_path = cmd.program.contains('/') || cmd.program.contains('\\');
                    if !is_path && which::which(&cmd.program).is_err() {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Warning,
                            message: format!(
                                "action '{name}': program '{}' was not found on PATH",
                                cmd.program
                            ),
                        });
                    }
                }
            }
        }

        warnings
    }
}
