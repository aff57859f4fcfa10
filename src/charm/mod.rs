//! Event handlers for the cloud-support charm.
//!
//! [`CloudSupportCharm`] maps each delivered event onto a short procedure:
//! lifecycle hooks apply configuration to the managed tool, and actions
//! forward their parameters to the OpenStack testing routines and attach the
//! outcome as action results.
//!
//! Deferred lifecycle events are re-delivered, oldest first, before the
//! current event. State is persisted only when the whole dispatch succeeds,
//! so a failed hook leaves the previous state in place for the retry.

mod error;

pub use error::CharmError;

use tracing::{debug, info, warn};

use crate::action::{ActionParams, ActionResults, split_nodes};
use crate::event::{ActionKind, HookEvent, LifecycleHook};
use crate::helper::ConfigHelper;
use crate::hook_tools::{HookEnvironment, LogLevel, WorkloadStatus};
use crate::os_testing::{CreateRequest, NodeOutcome, Provisioner};
use crate::state::{StateStore, StoredState};

/// Status message reported once the tool is configured.
pub const READY_MESSAGE: &str = "Unit is ready";

/// Status message reported while configuration waits on install.
pub const WAITING_MESSAGE: &str = "Waiting for install to complete";

/// The charm: its collaborators plus the state loaded for this dispatch.
#[derive(Debug)]
pub struct CloudSupportCharm<E, S, H, P> {
    env: E,
    store: S,
    helper: H,
    provisioner: P,
    state: StoredState,
}

impl<E, S, H, P> CloudSupportCharm<E, S, H, P>
where
    E: HookEnvironment,
    S: StateStore,
    H: ConfigHelper,
    P: Provisioner,
{
    /// Creates the charm and loads its stored state.
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::State`] when the state cannot be loaded.
    pub fn new(env: E, store: S, helper: H, provisioner: P) -> Result<Self, CharmError> {
        let state = store.load()?;
        Ok(Self {
            env,
            store,
            helper,
            provisioner,
            state,
        })
    }

    /// State as seen by this dispatch.
    #[must_use]
    pub const fn state(&self) -> &StoredState {
        &self.state
    }

    /// Handles `event` after re-delivering any deferred events, then
    /// persists the state if it changed.
    ///
    /// # Errors
    ///
    /// Returns the first [`CharmError`] raised by a handler. Nothing is
    /// persisted in that case.
    pub fn dispatch(&mut self, event: &HookEvent) -> Result<(), CharmError> {
        let before = self.state.clone();
        self.reemit_deferred()?;

        match *event {
            HookEvent::Lifecycle(hook) => self.handle_lifecycle(hook)?,
            HookEvent::Action(action) => self.run_action(action)?,
            HookEvent::Unobserved(ref name) => debug!(hook = %name, "no handler registered"),
        }

        if self.state != before {
            self.store.save(&self.state)?;
        }
        Ok(())
    }

    fn reemit_deferred(&mut self) -> Result<(), CharmError> {
        let pending = self.state.take_deferred();
        for (index, hook) in pending.iter().enumerate() {
            debug!(handle = %hook.handle(), "re-emitting deferred event");
            if let Err(err) = self.handle_lifecycle(*hook) {
                // Restore the unprocessed tail so the in-memory queue matches
                // what is still on disk.
                for remaining in pending.iter().skip(index) {
                    self.state.defer(*remaining);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn handle_lifecycle(&mut self, hook: LifecycleHook) -> Result<(), CharmError> {
        match hook {
            LifecycleHook::Install => self.on_install(),
            LifecycleHook::ConfigChanged => self.on_config_changed(),
        }
    }

    /// Applies the initial configuration and marks the unit installed.
    /// The status report that follows is best effort.
    ///
    /// # Errors
    ///
    /// Propagates configuration failures; the installed flag stays unset.
    pub fn on_install(&mut self) -> Result<(), CharmError> {
        let config = self.env.config()?;
        self.helper.update_config(&config)?;
        self.state.installed = true;
        info!("install complete");
        self.report_status(WorkloadStatus::Active, READY_MESSAGE);
        Ok(())
    }

    /// Reapplies configuration, or defers until install has completed.
    /// Logging and status reports are best effort.
    ///
    /// # Errors
    ///
    /// Propagates `config-get` and configuration failures.
    pub fn on_config_changed(&mut self) -> Result<(), CharmError> {
        if !self.state.installed {
            let message = format!(
                "Config changed called before install complete, deferring event: {}",
                LifecycleHook::ConfigChanged.handle()
            );
            info!("{message}");
            self.juju_log(LogLevel::Info, &message);
            self.state.defer(LifecycleHook::ConfigChanged);
            self.report_status(WorkloadStatus::Maintenance, WAITING_MESSAGE);
            return Ok(());
        }

        let config = self.env.config()?;
        let changed = self.helper.update_config(&config)?;
        info!(changed, "configuration applied");
        self.report_status(WorkloadStatus::Active, READY_MESSAGE);
        Ok(())
    }

    fn report_status(&self, status: WorkloadStatus, message: &str) {
        if let Err(err) = self.env.set_status(status, message) {
            warn!(error = %err, %status, "status-set failed");
        }
    }

    fn juju_log(&self, level: LogLevel, message: &str) {
        if let Err(err) = self.env.log(level, message) {
            warn!(error = %err, "juju-log failed");
        }
    }

    fn run_action(&self, action: ActionKind) -> Result<(), CharmError> {
        let params = self.env.action_params()?;
        info!(action = action.name(), "running action");
        match action {
            ActionKind::CreateTestInstance => self.on_create_test_instance(&params),
            ActionKind::DeleteTestInstance => self.on_delete_test_instance(&params),
            ActionKind::TestConnectivity => self.on_test_connectivity(&params),
        }
    }

    /// Creates a test instance on each requested node.
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::Provision`] after attaching an `error` result
    /// when the create routine fails, or a parameter error.
    pub fn on_create_test_instance(&self, params: &ActionParams) -> Result<(), CharmError> {
        let config = self.env.config()?;
        let request = CreateRequest {
            nodes: split_nodes(params.required_str("nodes")?),
            vcpus: params.optional_u32("vcpus")?.unwrap_or(config.vcpus),
            image: config.image,
            name_prefix: config.name_prefix,
            cidr: config.cidr,
            physnet: params.optional_str("physnet")?.map(str::to_owned),
            vnfspecs: params.optional_str("vnfspecs")?.map(str::to_owned),
        };

        let outcomes = match self.provisioner.create_instance(&request) {
            Ok(outcomes) => outcomes,
            Err(err) => {
                self.record_error(&err)?;
                return Err(err.into());
            }
        };

        let failed = outcomes.iter().any(NodeOutcome::is_error);
        if failed {
            warn!(nodes = request.nodes.len(), "test instance creation reported errors");
        }
        let mut results = ActionResults::new();
        results.insert("create-results", if failed { "error" } else { "success" });
        results.insert(
            "create-details",
            outcomes.iter().map(NodeOutcome::to_value).collect::<Vec<_>>(),
        );
        self.env.set_results(&results)?;
        Ok(())
    }

    /// Deletes test instances matching the requested pattern.
    ///
    /// # Errors
    ///
    /// Propagates parameter and delete routine failures.
    pub fn on_delete_test_instance(&self, params: &ActionParams) -> Result<(), CharmError> {
        let nodes = split_nodes(params.required_str("nodes")?);
        let pattern = params.required_str("pattern")?;
        let deleted = self.provisioner.delete_instance(&nodes, pattern)?;

        let mut results = ActionResults::new();
        results.insert("delete-results", deleted);
        self.env.set_results(&results)?;
        Ok(())
    }

    /// Tests connectivity to a test instance.
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::Provision`] after attaching an `error` result
    /// when the routine fails, or a parameter error.
    pub fn on_test_connectivity(&self, params: &ActionParams) -> Result<(), CharmError> {
        let instance = params.optional_str("instance")?;
        match self.provisioner.test_connectivity(instance) {
            Ok(outcome) => {
                self.env.set_results(&ActionResults::from_map(outcome))?;
                Ok(())
            }
            Err(err) => {
                self.record_error(&err)?;
                Err(err.into())
            }
        }
    }

    fn record_error(&self, err: &impl std::error::Error) -> Result<(), CharmError> {
        let mut results = ActionResults::new();
        results.insert("error", err.to_string());
        self.env.set_results(&results)?;
        Ok(())
    }
}
