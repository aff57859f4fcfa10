//! Decoding of the event the Juju agent is delivering.
//!
//! Juju runs the charm's `dispatch` script with `JUJU_DISPATCH_PATH` set to
//! `hooks/<name>` or `actions/<name>`. Older agents execute symlinks under
//! `hooks/` directly, in which case the executable name carries the hook.

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name used when rendering event handles in log messages.
pub const CHARM_NAME: &str = "CloudSupportCharm";

/// Lifecycle hooks the charm observes. Only these can be deferred.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleHook {
    /// The unit is being installed.
    Install,
    /// The charm configuration changed.
    ConfigChanged,
}

impl LifecycleHook {
    /// Hook name as used by Juju.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::ConfigChanged => "config-changed",
        }
    }

    /// Handle path identifying the event in log output.
    #[must_use]
    pub fn handle(self) -> String {
        format!("{CHARM_NAME}/on/{}", self.name().replace('-', "_"))
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "install" => Some(Self::Install),
            "config-changed" => Some(Self::ConfigChanged),
            _ => None,
        }
    }
}

/// Actions declared in `actions.yaml`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionKind {
    /// Boot a test instance on each requested compute node.
    CreateTestInstance,
    /// Remove test instances matching a name pattern.
    DeleteTestInstance,
    /// Check network reachability of a test instance.
    TestConnectivity,
}

impl ActionKind {
    /// Action name as used by Juju.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateTestInstance => "create-test-instance",
            Self::DeleteTestInstance => "delete-test-instance",
            Self::TestConnectivity => "test-connectivity",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "create-test-instance" => Some(Self::CreateTestInstance),
            "delete-test-instance" => Some(Self::DeleteTestInstance),
            "test-connectivity" => Some(Self::TestConnectivity),
            _ => None,
        }
    }
}

/// An event delivered to the charm process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HookEvent {
    /// A lifecycle hook with a registered handler.
    Lifecycle(LifecycleHook),
    /// A user-invoked action.
    Action(ActionKind),
    /// Any other hook; it only triggers re-delivery of deferred events.
    Unobserved(String),
}

impl HookEvent {
    /// Decodes a dispatch path such as `hooks/install` or
    /// `actions/test-connectivity`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPath`] when the path has no final
    /// component, or [`EventError::UnknownAction`] for undeclared actions.
    pub fn from_dispatch_path(path: &str) -> Result<Self, EventError> {
        let dispatch = Utf8Path::new(path.trim());
        let name = dispatch
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| EventError::InvalidPath(path.to_owned()))?;
        let kind = dispatch
            .parent()
            .and_then(Utf8Path::file_name)
            .unwrap_or_default();

        if kind == "actions" {
            return ActionKind::from_name(name)
                .map(Self::Action)
                .ok_or_else(|| EventError::UnknownAction(name.to_owned()));
        }

        Ok(LifecycleHook::from_name(name)
            .map_or_else(|| Self::Unobserved(name.to_owned()), Self::Lifecycle))
    }

    /// Returns `true` for action events.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(hook) => write!(f, "hooks/{}", hook.name()),
            Self::Action(action) => write!(f, "actions/{}", action.name()),
            Self::Unobserved(name) => write!(f, "hooks/{name}"),
        }
    }
}

/// Errors raised while decoding the dispatch path.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EventError {
    /// The dispatch path does not name an event.
    #[error("invalid dispatch path: {0:?}")]
    InvalidPath(String),
    /// The action is not declared by this charm.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}
