//! Shared fixtures and helpers for charm BDD scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use cloudsupport_charm::test_support::{
    MemoryEnvironment, MemoryStateStore, RecordingHelper, ScriptedProvisioner,
};
use cloudsupport_charm::{CharmConfig, CloudSupportCharm, HookEvent};
use rstest::fixture;

#[derive(Clone, Debug)]
pub enum DispatchOutcome {
    Success,
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct CharmContext {
    pub env: MemoryEnvironment,
    pub store: MemoryStateStore,
    pub helper: RecordingHelper,
    pub provisioner: ScriptedProvisioner,
    pub outcome: Rc<RefCell<Option<DispatchOutcome>>>,
}

impl CharmContext {
    /// Decodes `path` and runs a fresh charm over the shared doubles.
    pub fn deliver(&self, path: &str) {
        let result = HookEvent::from_dispatch_path(path)
            .map_err(|err| err.to_string())
            .and_then(|event| {
                let mut charm = CloudSupportCharm::new(
                    self.env.clone(),
                    self.store.clone(),
                    self.helper.clone(),
                    self.provisioner.clone(),
                )
                .map_err(|err| err.to_string())?;
                charm.dispatch(&event).map_err(|err| err.to_string())
            });
        let outcome = match result {
            Ok(()) => DispatchOutcome::Success,
            Err(message) => DispatchOutcome::Failure(message),
        };
        *self.outcome.borrow_mut() = Some(outcome);
    }

    pub fn outcome(&self) -> Option<DispatchOutcome> {
        self.outcome.borrow().clone()
    }
}

#[fixture]
pub fn charm_context() -> CharmContext {
    CharmContext {
        env: MemoryEnvironment::new(CharmConfig::default()),
        store: MemoryStateStore::default(),
        helper: RecordingHelper::new(),
        provisioner: ScriptedProvisioner::new(),
        outcome: Rc::new(RefCell::new(None)),
    }
}

pub fn node_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_owned).collect()
}
