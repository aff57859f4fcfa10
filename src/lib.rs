//! Core library for the cloud-support charm.
//!
//! The crate implements a Juju charm that configures a cloud-support tool on
//! top of an OpenStack deployment and exposes actions for creating, deleting,
//! and probing test instances. Event handling lives in [`charm`]; the Juju
//! hook tools, stored state, configuration helper, and OpenStack testing
//! routines sit behind traits so each can be replaced in tests.

pub mod action;
pub mod charm;
pub mod config;
pub mod event;
pub mod helper;
pub mod hook_tools;
pub mod os_testing;
pub mod process;
pub mod state;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;

pub use action::{ActionParams, ActionResults, ParamError, split_nodes};
pub use charm::{CharmError, CloudSupportCharm};
pub use config::{CharmConfig, RuntimeConfig, RuntimeConfigError};
pub use event::{ActionKind, EventError, HookEvent, LifecycleHook};
pub use helper::{CloudSupportHelper, ConfigHelper, HelperError};
pub use hook_tools::{HookEnvironment, HookToolError, HookTools, LogLevel, WorkloadStatus};
pub use os_testing::{CreateRequest, NodeOutcome, OsTestingCli, ProvisionError, Provisioner};
pub use process::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use state::{FileStateStore, StateError, StateStore, StoredState};
