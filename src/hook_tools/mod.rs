//! Client for the Juju hook tools.
//!
//! During a hook the Juju agent exposes small executables (`config-get`,
//! `action-get`, `action-set`, `action-fail`, `juju-log`, `status-set`) that
//! read and write unit data. [`HookTools`] shells out to them through a
//! [`CommandRunner`], and [`HookEnvironment`] abstracts the calls the charm
//! makes so tests can substitute an in-memory double.

use std::ffi::OsString;
use std::fmt;

use camino::Utf8PathBuf;
use serde_json::Value;
use thiserror::Error;

use crate::action::{ActionParams, ActionResults};
use crate::config::CharmConfig;
use crate::process::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};

/// Severity passed to `juju-log --log-level`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    /// Normal operational messages.
    Info,
    /// A failure.
    Error,
}

impl LogLevel {
    /// Level name understood by `juju-log`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

/// Workload status reported through `status-set`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkloadStatus {
    /// The unit is ready.
    Active,
    /// The unit is doing work that needs no operator involvement.
    Maintenance,
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
        };
        f.write_str(name)
    }
}

/// Errors raised while talking to the hook tools.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HookToolError {
    /// Raised when a hook tool exits with a non-zero status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Hook tool that failed.
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the tool.
        stderr: String,
    },
    /// Raised when tool output cannot be decoded.
    #[error("failed to parse {tool} output: {message}")]
    Parse {
        /// Hook tool whose output was rejected.
        tool: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a tool cannot be started.
    #[error(transparent)]
    Runner(#[from] CommandError),
}

/// Operations the charm performs against the Juju agent.
pub trait HookEnvironment {
    /// Reads the charm configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `config-get` fails or its output does
    /// not decode.
    fn config(&self) -> Result<CharmConfig, HookToolError>;

    /// Reads the parameters of the running action.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `action-get` fails or its output is not
    /// a JSON object.
    fn action_params(&self) -> Result<ActionParams, HookToolError>;

    /// Attaches results to the running action.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `action-set` fails.
    fn set_results(&self, results: &ActionResults) -> Result<(), HookToolError>;

    /// Marks the running action as failed.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `action-fail` fails.
    fn fail_action(&self, message: &str) -> Result<(), HookToolError>;

    /// Writes a message to the unit's Juju log.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `juju-log` fails.
    fn log(&self, level: LogLevel, message: &str) -> Result<(), HookToolError>;

    /// Reports the unit's workload status.
    ///
    /// # Errors
    ///
    /// Returns [`HookToolError`] when `status-set` fails.
    fn set_status(&self, status: WorkloadStatus, message: &str) -> Result<(), HookToolError>;
}

/// Hook-tool client that shells out through a [`CommandRunner`].
#[derive(Clone, Debug)]
pub struct HookTools<R: CommandRunner> {
    runner: R,
    tools_dir: Option<Utf8PathBuf>,
}

impl HookTools<ProcessCommandRunner> {
    /// Creates a client wired to the real process runner.
    #[must_use]
    pub const fn with_process_runner(tools_dir: Option<Utf8PathBuf>) -> Self {
        Self::new(ProcessCommandRunner, tools_dir)
    }
}

impl<R: CommandRunner> HookTools<R> {
    /// Creates a client. Tools are resolved inside `tools_dir` when given,
    /// otherwise on `PATH`.
    #[must_use]
    pub const fn new(runner: R, tools_dir: Option<Utf8PathBuf>) -> Self {
        Self { runner, tools_dir }
    }

    fn program(&self, tool: &str) -> String {
        self.tools_dir
            .as_ref()
            .map_or_else(|| tool.to_owned(), |dir| dir.join(tool).into_string())
    }

    fn run_tool(&self, tool: &str, args: &[OsString]) -> Result<CommandOutput, HookToolError> {
        let program = self.program(tool);
        let output = self.runner.run(&program, args)?;
        if output.is_success() {
            return Ok(output);
        }

        Err(HookToolError::CommandFailure {
            status_text: output.status_text(),
            program,
            status: output.code,
            stderr: output.stderr,
        })
    }

    fn run_json(&self, tool: &str) -> Result<Value, HookToolError> {
        let output = self.run_tool(tool, &[OsString::from("--format=json")])?;
        if output.stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&output.stdout).map_err(|err| HookToolError::Parse {
            tool: tool.to_owned(),
            message: err.to_string(),
        })
    }
}

impl<R: CommandRunner> HookEnvironment for HookTools<R> {
    fn config(&self) -> Result<CharmConfig, HookToolError> {
        let raw = self.run_json("config-get")?;
        serde_json::from_value(raw).map_err(|err| HookToolError::Parse {
            tool: String::from("config-get"),
            message: err.to_string(),
        })
    }

    fn action_params(&self) -> Result<ActionParams, HookToolError> {
        match self.run_json("action-get")? {
            Value::Null => Ok(ActionParams::default()),
            Value::Object(params) => Ok(ActionParams::new(params)),
            other => Err(HookToolError::Parse {
                tool: String::from("action-get"),
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }

    fn set_results(&self, results: &ActionResults) -> Result<(), HookToolError> {
        let args = results
            .flatten()
            .into_iter()
            .map(|(key, value)| OsString::from(format!("{key}={value}")))
            .collect::<Vec<_>>();
        if args.is_empty() {
            return Ok(());
        }
        self.run_tool("action-set", &args).map(drop)
    }

    fn fail_action(&self, message: &str) -> Result<(), HookToolError> {
        self.run_tool("action-fail", &[OsString::from(message)]).map(drop)
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<(), HookToolError> {
        let args = [
            OsString::from("--log-level"),
            OsString::from(level.as_str()),
            OsString::from(message),
        ];
        self.run_tool("juju-log", &args).map(drop)
    }

    fn set_status(&self, status: WorkloadStatus, message: &str) -> Result<(), HookToolError> {
        let args = [OsString::from(status.to_string()), OsString::from(message)];
        self.run_tool("status-set", &args).map(drop)
    }
}
