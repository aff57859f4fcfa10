//! OpenStack test-instance routines.
//!
//! Creating, deleting, and probing test instances is delegated to the
//! `os-testing` executable shipped with the cloud-support tool. The charm
//! talks to it through the [`Provisioner`] trait; [`OsTestingCli`] is the
//! implementation that shells out and decodes its JSON output.

use std::ffi::OsString;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::DEFAULT_OS_TESTING_BIN;
use crate::process::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};

/// Status tag marking a failed node in create results.
pub const ERROR_TAG: &str = "error";

/// Parameters for creating one test instance per node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateRequest {
    /// Compute nodes to place an instance on.
    pub nodes: Vec<String>,
    /// vCPU count for each instance.
    pub vcpus: u32,
    /// Image name.
    pub image: String,
    /// Prefix for instance names.
    pub name_prefix: String,
    /// Subnet CIDR for the test network.
    pub cidr: String,
    /// Provider physical network, when the test network needs one.
    pub physnet: Option<String>,
    /// VNF specification passed through to the tool.
    pub vnfspecs: Option<String>,
}

/// Outcome for a single node: a status tag and tool-specific detail.
///
/// Decoded from a two-element JSON array such as `["ok", {...}]`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NodeOutcome(
    /// Status tag, `"error"` for a failed node.
    pub String,
    /// Tool-specific detail.
    pub Value,
);

impl NodeOutcome {
    /// Creates an outcome.
    #[must_use]
    pub fn new(status: impl Into<String>, detail: impl Into<Value>) -> Self {
        Self(status.into(), detail.into())
    }

    /// Returns `true` when the status tag is exactly `"error"`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.0 == ERROR_TAG
    }

    /// Renders the outcome back into its two-element array form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(vec![Value::String(self.0.clone()), self.1.clone()])
    }
}

/// Errors raised by the OpenStack testing routines.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProvisionError {
    /// Raised when the tool exits with a non-zero status.
    #[error("{program} {operation} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed.
        program: String,
        /// Subcommand being run.
        operation: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the tool.
        stderr: String,
    },
    /// Raised when tool output cannot be decoded.
    #[error("failed to parse {operation} output: {message}")]
    Parse {
        /// Subcommand whose output was rejected.
        operation: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when the tool cannot be started.
    #[error(transparent)]
    Runner(#[from] CommandError),
}

/// Boundary to the routines that manage test instances.
pub trait Provisioner {
    /// Creates a test instance on every node in the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the routine fails as a whole.
    /// Per-node failures are reported as outcomes tagged `"error"`.
    fn create_instance(&self, request: &CreateRequest) -> Result<Vec<NodeOutcome>, ProvisionError>;

    /// Deletes test instances on `nodes` whose names match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the routine fails.
    fn delete_instance(&self, nodes: &[String], pattern: &str) -> Result<Value, ProvisionError>;

    /// Tests connectivity to `instance`, or to a default test instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the routine fails.
    fn test_connectivity(&self, instance: Option<&str>)
    -> Result<Map<String, Value>, ProvisionError>;
}

/// Shells out to the `os-testing` executable.
#[derive(Clone, Debug)]
pub struct OsTestingCli<R: CommandRunner> {
    program: String,
    runner: R,
}

impl OsTestingCli<ProcessCommandRunner> {
    /// Creates a client wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(program: impl Into<String>) -> Self {
        Self::new(program, ProcessCommandRunner)
    }
}

impl Default for OsTestingCli<ProcessCommandRunner> {
    fn default() -> Self {
        Self::with_process_runner(DEFAULT_OS_TESTING_BIN)
    }
}

impl<R: CommandRunner> OsTestingCli<R> {
    /// Creates a client invoking `program` through `runner`.
    #[must_use]
    pub fn new(program: impl Into<String>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn run(&self, operation: &str, args: &[OsString]) -> Result<CommandOutput, ProvisionError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(OsString::from(operation));
        argv.extend_from_slice(args);

        let output = self.runner.run(&self.program, &argv)?;
        if output.is_success() {
            return Ok(output);
        }

        Err(ProvisionError::CommandFailure {
            program: self.program.clone(),
            operation: operation.to_owned(),
            status: output.code,
            status_text: output.status_text(),
            stderr: output.stderr,
        })
    }

    fn run_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: &[OsString],
    ) -> Result<T, ProvisionError> {
        let output = self.run(operation, args)?;
        serde_json::from_str(&output.stdout).map_err(|err| ProvisionError::Parse {
            operation: operation.to_owned(),
            message: err.to_string(),
        })
    }
}

impl<R: CommandRunner> Provisioner for OsTestingCli<R> {
    fn create_instance(&self, request: &CreateRequest) -> Result<Vec<NodeOutcome>, ProvisionError> {
        let mut args = vec![
            OsString::from("--nodes"),
            OsString::from(request.nodes.join(",")),
            OsString::from("--vcpus"),
            OsString::from(request.vcpus.to_string()),
            OsString::from("--image"),
            OsString::from(&request.image),
            OsString::from("--name-prefix"),
            OsString::from(&request.name_prefix),
            OsString::from("--cidr"),
            OsString::from(&request.cidr),
        ];
        if let Some(ref physnet) = request.physnet {
            args.push(OsString::from("--physnet"));
            args.push(OsString::from(physnet));
        }
        if let Some(ref vnfspecs) = request.vnfspecs {
            args.push(OsString::from("--vnfspecs"));
            args.push(OsString::from(vnfspecs));
        }
        self.run_json("create", &args)
    }

    fn delete_instance(&self, nodes: &[String], pattern: &str) -> Result<Value, ProvisionError> {
        let args = [
            OsString::from("--nodes"),
            OsString::from(nodes.join(",")),
            OsString::from("--pattern"),
            OsString::from(pattern),
        ];
        self.run_json("delete", &args)
    }

    fn test_connectivity(
        &self,
        instance: Option<&str>,
    ) -> Result<Map<String, Value>, ProvisionError> {
        let args = instance.map_or_else(Vec::new, |id| {
            vec![OsString::from("--instance"), OsString::from(id)]
        });
        self.run_json("test-connectivity", &args)
    }
}
