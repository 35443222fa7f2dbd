//! Job identity, lifecycle status and base settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::CoreError;

/// Persisted stop command value that means "send an interrupt signal".
pub const INTERRUPT_SENTINEL: &str = "^C";

/// Default grace period before a stopping process is killed.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Globally unique identity of a job: `(game_type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    /// Slash-delimited game type, e.g. `minecraft/paper`.
    #[serde(rename = "type")]
    pub game_type: String,
    /// Job id, unique within its game type.
    pub id: String,
}

impl JobKey {
    pub fn new(game_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            game_type: game_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.game_type, self.id)
    }
}

/// Job lifecycle status.
///
/// `Stopped -> Starting|Running -> Stopping -> Stopped`, with crashes going
/// straight back to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
        }
    }

    /// True while a process is expected to be alive.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a running job is asked to stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopCommand {
    /// Send an interrupt signal to the process.
    Interrupt,
    /// Write this line to the process console.
    Console(String),
}

impl StopCommand {
    pub fn console(command: impl Into<String>) -> Self {
        Self::Console(command.into())
    }
}

impl From<String> for StopCommand {
    fn from(value: String) -> Self {
        if value == INTERRUPT_SENTINEL {
            Self::Interrupt
        } else {
            Self::Console(value)
        }
    }
}

impl From<StopCommand> for String {
    fn from(value: StopCommand) -> Self {
        match value {
            StopCommand::Interrupt => INTERRUPT_SENTINEL.to_string(),
            StopCommand::Console(cmd) => cmd,
        }
    }
}

/// Settings every job has regardless of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSettings {
    /// Startup command template with `{name}` placeholders.
    pub startup_command: String,
    pub stop_command: StopCommand,
    /// `None` disables readiness detection; an empty string means the job
    /// type marks readiness itself.
    pub start_indicator: Option<String>,
    pub auto_start: bool,
    pub restart_on_crash: bool,
    /// Grace period in seconds before a stopping process is killed.
    pub stop_timeout: u64,
}

impl JobSettings {
    pub fn new(startup_command: impl Into<String>, stop_command: StopCommand) -> Self {
        Self {
            startup_command: startup_command.into(),
            stop_command,
            start_indicator: None,
            auto_start: false,
            restart_on_crash: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT.as_secs(),
        }
    }

    #[must_use]
    pub fn with_start_indicator(mut self, indicator: Option<String>) -> Self {
        self.start_indicator = indicator;
        self
    }

    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout)
    }

    /// Read a base field by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        let value = match name {
            "startup_command" => Value::from(self.startup_command.clone()),
            "stop_command" => Value::from(String::from(self.stop_command.clone())),
            "start_indicator" => self
                .start_indicator
                .clone()
                .map_or(Value::Null, Value::from),
            "auto_start" => Value::from(self.auto_start),
            "restart_on_crash" => Value::from(self.restart_on_crash),
            "stop_timeout" => Value::from(self.stop_timeout),
            _ => return None,
        };
        Some(value)
    }

    /// Write a base field by name. Returns `Ok(false)` if `name` is not a base field.
    pub fn set(&mut self, name: &str, value: &Value) -> Result<bool, CoreError> {
        match name {
            "startup_command" => self.startup_command = expect_str(name, value)?.to_string(),
            "stop_command" => {
                self.stop_command = StopCommand::from(expect_str(name, value)?.to_string());
            }
            "start_indicator" => {
                self.start_indicator = match value {
                    Value::Null => None,
                    other => Some(expect_str(name, other)?.to_string()),
                };
            }
            "auto_start" => self.auto_start = expect_bool(name, value)?,
            "restart_on_crash" => self.restart_on_crash = expect_bool(name, value)?,
            "stop_timeout" => {
                self.stop_timeout = value
                    .as_u64()
                    .ok_or_else(|| CoreError::invalid_field(name, "expected a non-negative integer"))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, CoreError> {
    value
        .as_str()
        .ok_or_else(|| CoreError::invalid_field(name, "expected a string"))
}

fn expect_bool(name: &str, value: &Value) -> Result<bool, CoreError> {
    value
        .as_bool()
        .ok_or_else(|| CoreError::invalid_field(name, "expected a bool"))
}
