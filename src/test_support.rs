//! Test support utilities shared across unit and integration tests.
//!
//! Every double shares its state between clones, so a test can hand one
//! clone to the charm and inspect the recorded calls through another.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::action::{ActionParams, ActionResults};
use crate::config::CharmConfig;
use crate::helper::{ConfigHelper, HelperError};
use crate::hook_tools::{HookEnvironment, HookToolError, LogLevel, WorkloadStatus};
use crate::os_testing::{CreateRequest, NodeOutcome, ProvisionError, Provisioner};
use crate::process::{CommandError, CommandOutput, CommandRunner};
use crate::state::{StateError, StateStore, StoredState};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns the arguments as UTF-8 strings for assertions.
    #[must_use]
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with empty output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

#[derive(Debug, Default)]
struct EnvironmentState {
    config: CharmConfig,
    params: ActionParams,
    results: Vec<ActionResults>,
    failures: Vec<String>,
    logs: Vec<(LogLevel, String)>,
    statuses: Vec<(WorkloadStatus, String)>,
    reporting_fails: bool,
}

/// In-memory [`HookEnvironment`] recording everything the charm reports.
#[derive(Clone, Debug, Default)]
pub struct MemoryEnvironment {
    state: Rc<RefCell<EnvironmentState>>,
}

impl MemoryEnvironment {
    /// Creates an environment serving `config`.
    #[must_use]
    pub fn new(config: CharmConfig) -> Self {
        let env = Self::default();
        env.state.borrow_mut().config = config;
        env
    }

    /// Replaces the parameters served to the next action. Non-object values
    /// clear the parameters.
    pub fn set_params(&self, params: Value) {
        let map = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.state.borrow_mut().params = ActionParams::new(map);
    }

    /// Makes every following `log` and `set_status` call fail as if the
    /// hook tool exited non-zero.
    pub fn fail_reporting(&self) {
        self.state.borrow_mut().reporting_fails = true;
    }

    /// Every result map attached so far, in call order.
    #[must_use]
    pub fn results(&self) -> Vec<ActionResults> {
        self.state.borrow().results.clone()
    }

    /// The most recently attached result map.
    #[must_use]
    pub fn last_results(&self) -> Option<ActionResults> {
        self.state.borrow().results.last().cloned()
    }

    /// Messages passed to `fail_action`.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.state.borrow().failures.clone()
    }

    /// Messages written to the Juju log.
    #[must_use]
    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.state.borrow().logs.clone()
    }

    /// Workload statuses reported, in call order.
    #[must_use]
    pub fn statuses(&self) -> Vec<(WorkloadStatus, String)> {
        self.state.borrow().statuses.clone()
    }
}

impl HookEnvironment for MemoryEnvironment {
    fn config(&self) -> Result<CharmConfig, HookToolError> {
        Ok(self.state.borrow().config.clone())
    }

    fn action_params(&self) -> Result<ActionParams, HookToolError> {
        Ok(self.state.borrow().params.clone())
    }

    fn set_results(&self, results: &ActionResults) -> Result<(), HookToolError> {
        self.state.borrow_mut().results.push(results.clone());
        Ok(())
    }

    fn fail_action(&self, message: &str) -> Result<(), HookToolError> {
        self.state.borrow_mut().failures.push(message.to_owned());
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<(), HookToolError> {
        let mut state = self.state.borrow_mut();
        if state.reporting_fails {
            return Err(tool_failure("juju-log"));
        }
        state.logs.push((level, message.to_owned()));
        Ok(())
    }

    fn set_status(&self, status: WorkloadStatus, message: &str) -> Result<(), HookToolError> {
        let mut state = self.state.borrow_mut();
        if state.reporting_fails {
            return Err(tool_failure("status-set"));
        }
        state.statuses.push((status, message.to_owned()));
        Ok(())
    }
}

fn tool_failure(program: &str) -> HookToolError {
    HookToolError::CommandFailure {
        program: program.to_owned(),
        status: Some(1),
        status_text: String::from("1"),
        stderr: String::from("simulated failure"),
    }
}

/// In-memory [`StateStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStateStore {
    state: Rc<RefCell<StoredState>>,
    saves: Rc<RefCell<u32>>,
}

impl MemoryStateStore {
    /// Creates a store holding `state`.
    #[must_use]
    pub fn with_state(state: StoredState) -> Self {
        let store = Self::default();
        *store.state.borrow_mut() = state;
        store
    }

    /// Replaces the stored state without counting a save.
    pub fn set_state(&self, state: StoredState) {
        *self.state.borrow_mut() = state;
    }

    /// The currently stored state.
    #[must_use]
    pub fn stored(&self) -> StoredState {
        self.state.borrow().clone()
    }

    /// Number of times `save` was called.
    #[must_use]
    pub fn save_calls(&self) -> u32 {
        *self.saves.borrow()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<StoredState, StateError> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &StoredState) -> Result<(), StateError> {
        *self.state.borrow_mut() = state.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// [`ConfigHelper`] that counts calls and can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct RecordingHelper {
    calls: Rc<RefCell<Vec<CharmConfig>>>,
    fail: Rc<RefCell<bool>>,
}

impl RecordingHelper {
    /// Creates a helper that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `update_config` call fail.
    pub fn fail_updates(&self) {
        *self.fail.borrow_mut() = true;
    }

    /// Number of `update_config` calls so far, including failed ones.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ConfigHelper for RecordingHelper {
    fn update_config(&self, config: &CharmConfig) -> Result<bool, HelperError> {
        self.calls.borrow_mut().push(config.clone());
        if *self.fail.borrow() {
            return Err(HelperError::InvalidConfig {
                option: String::from("image"),
            });
        }
        Ok(true)
    }
}

#[derive(Debug, Default)]
struct ProvisionerState {
    create_response: Option<Result<Vec<NodeOutcome>, ProvisionError>>,
    delete_response: Option<Result<Value, ProvisionError>>,
    connectivity_response: Option<Result<Map<String, Value>, ProvisionError>>,
    create_requests: Vec<CreateRequest>,
    delete_requests: Vec<(Vec<String>, String)>,
    connectivity_requests: Vec<Option<String>>,
}

/// [`Provisioner`] returning scripted responses and recording requests.
///
/// Unscripted calls succeed with empty results.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvisioner {
    state: Rc<RefCell<ProvisionerState>>,
}

impl ScriptedProvisioner {
    /// Creates a provisioner with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response to `create_instance`.
    pub fn respond_to_create(&self, response: Result<Vec<NodeOutcome>, ProvisionError>) {
        self.state.borrow_mut().create_response = Some(response);
    }

    /// Scripts the response to `delete_instance`.
    pub fn respond_to_delete(&self, response: Result<Value, ProvisionError>) {
        self.state.borrow_mut().delete_response = Some(response);
    }

    /// Scripts the response to `test_connectivity`.
    pub fn respond_to_connectivity(&self, response: Result<Map<String, Value>, ProvisionError>) {
        self.state.borrow_mut().connectivity_response = Some(response);
    }

    /// Requests passed to `create_instance`.
    #[must_use]
    pub fn create_requests(&self) -> Vec<CreateRequest> {
        self.state.borrow().create_requests.clone()
    }

    /// `(nodes, pattern)` pairs passed to `delete_instance`.
    #[must_use]
    pub fn delete_requests(&self) -> Vec<(Vec<String>, String)> {
        self.state.borrow().delete_requests.clone()
    }

    /// Instance identifiers passed to `test_connectivity`.
    #[must_use]
    pub fn connectivity_requests(&self) -> Vec<Option<String>> {
        self.state.borrow().connectivity_requests.clone()
    }
}

impl Provisioner for ScriptedProvisioner {
    fn create_instance(&self, request: &CreateRequest) -> Result<Vec<NodeOutcome>, ProvisionError> {
        let mut state = self.state.borrow_mut();
        state.create_requests.push(request.clone());
        state.create_response.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn delete_instance(&self, nodes: &[String], pattern: &str) -> Result<Value, ProvisionError> {
        let mut state = self.state.borrow_mut();
        state
            .delete_requests
            .push((nodes.to_vec(), pattern.to_owned()));
        state
            .delete_response
            .clone()
            .unwrap_or_else(|| Ok(Value::Array(Vec::new())))
    }

    fn test_connectivity(
        &self,
        instance: Option<&str>,
    ) -> Result<Map<String, Value>, ProvisionError> {
        let mut state = self.state.borrow_mut();
        state.connectivity_requests.push(instance.map(str::to_owned));
        state
            .connectivity_response
            .clone()
            .unwrap_or_else(|| Ok(Map::new()))
    }
}

/// Builds a scripted tool failure for provisioner tests.
#[must_use]
pub fn provision_failure(operation: &str, stderr: &str) -> ProvisionError {
    ProvisionError::CommandFailure {
        program: String::from("os-testing"),
        operation: operation.to_owned(),
        status: Some(1),
        status_text: String::from("1"),
        stderr: stderr.to_owned(),
    }
}
