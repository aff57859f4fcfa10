//! Error type for charm event handling.

use thiserror::Error;

use crate::action::ParamError;
use crate::config::RuntimeConfigError;
use crate::event::EventError;
use crate::helper::HelperError;
use crate::hook_tools::HookToolError;
use crate::os_testing::ProvisionError;
use crate::state::StateError;

/// Errors that fail a hook or action.
#[derive(Debug, Error)]
pub enum CharmError {
    /// The dispatch path could not be decoded.
    #[error(transparent)]
    Event(#[from] EventError),
    /// Runtime settings are invalid.
    #[error(transparent)]
    RuntimeConfig(#[from] RuntimeConfigError),
    /// A Juju hook tool failed.
    #[error(transparent)]
    HookTool(#[from] HookToolError),
    /// Unit state could not be loaded or saved.
    #[error(transparent)]
    State(#[from] StateError),
    /// Applying configuration to the managed tool failed.
    #[error("failed to update tool configuration: {0}")]
    Helper(#[from] HelperError),
    /// An OpenStack testing routine failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// An action parameter was missing or malformed.
    #[error(transparent)]
    Parameter(#[from] ParamError),
}
