//! BDD scenarios for charm event handling.

use rstest_bdd_macros::scenario;

use super::test_helpers::{CharmContext, charm_context};

#[scenario(
    path = "tests/features/charm.feature",
    name = "Install applies the tool configuration"
)]
fn scenario_install_applies_configuration(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(
    path = "tests/features/charm.feature",
    name = "Defer configuration changes until install completes"
)]
fn scenario_defer_config_changed(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(
    path = "tests/features/charm.feature",
    name = "Re-deliver a deferred configuration change after install"
)]
fn scenario_redeliver_deferred(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(
    path = "tests/features/charm.feature",
    name = "Report per-node failures from instance creation"
)]
fn scenario_create_reports_node_failures(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(
    path = "tests/features/charm.feature",
    name = "Surface create routine failures as an error result"
)]
fn scenario_create_failure(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(
    path = "tests/features/charm.feature",
    name = "Forward the delete pattern to the delete routine"
)]
fn scenario_delete_forwards_pattern(charm_context: CharmContext) {
    let _ = charm_context;
}

#[scenario(path = "tests/features/charm.feature", name = "Reject unknown actions")]
fn scenario_reject_unknown_actions(charm_context: CharmContext) {
    let _ = charm_context;
}
