//! BDD step definitions for charm event handling.

use cloudsupport_charm::test_support::provision_failure;
use cloudsupport_charm::{LifecycleHook, NodeOutcome, StoredState, WorkloadStatus};
use rstest_bdd_macros::{given, then, when};
use serde_json::{Value, json};

use super::test_helpers::{CharmContext, DispatchOutcome, node_list};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn lifecycle_hook(name: &str) -> LifecycleHook {
    serde_json::from_value(json!(name))
        .unwrap_or_else(|err| panic!("unknown lifecycle hook {name}: {err}"))
}

#[given("a freshly deployed unit")]
fn fresh_unit(charm_context: &CharmContext) {
    charm_context.store.set_state(StoredState::default());
}

#[given("an installed unit")]
fn installed_unit(charm_context: &CharmContext) {
    charm_context.store.set_state(StoredState {
        installed: true,
        deferred: Vec::new(),
    });
}

#[given("a deferred \"{hook}\" event")]
fn deferred_event(charm_context: &CharmContext, hook: String) {
    let mut state = charm_context.store.stored();
    state.defer(lifecycle_hook(hook.trim()));
    charm_context.store.set_state(state);
}

#[given("the action is invoked with nodes \"{nodes}\"")]
fn action_with_nodes(charm_context: &CharmContext, nodes: String) {
    charm_context.env.set_params(json!({ "nodes": nodes }));
}

#[given("the delete action targets pattern \"{pattern}\" on nodes \"{nodes}\"")]
fn delete_action_params(charm_context: &CharmContext, pattern: String, nodes: String) {
    charm_context
        .env
        .set_params(json!({ "nodes": nodes, "pattern": pattern }));
}

#[given("the create routine reports outcomes \"{statuses}\"")]
fn create_reports_outcomes(charm_context: &CharmContext, statuses: String) {
    let outcomes = statuses
        .split(',')
        .enumerate()
        .map(|(index, status)| NodeOutcome::new(status.trim(), json!({ "index": index })))
        .collect();
    charm_context.provisioner.respond_to_create(Ok(outcomes));
}

#[given("the create routine fails with \"{message}\"")]
fn create_fails(charm_context: &CharmContext, message: String) {
    charm_context
        .provisioner
        .respond_to_create(Err(provision_failure("create", &message)));
}

#[when("the \"{path}\" event is delivered")]
fn deliver_event(charm_context: &CharmContext, path: String) {
    charm_context.deliver(path.trim());
}

#[then("the event succeeds")]
fn event_succeeds(charm_context: &CharmContext) -> Result<(), StepError> {
    match charm_context.outcome() {
        Some(DispatchOutcome::Success) => Ok(()),
        Some(DispatchOutcome::Failure(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("no event was delivered"))),
    }
}

#[then("the event fails")]
fn event_fails(charm_context: &CharmContext) -> Result<(), StepError> {
    match charm_context.outcome() {
        Some(DispatchOutcome::Failure(_)) => Ok(()),
        Some(DispatchOutcome::Success) => Err(StepError::Assertion(String::from(
            "expected failure, got success",
        ))),
        None => Err(StepError::Assertion(String::from("no event was delivered"))),
    }
}

#[then("the configuration helper ran {count:u32} times")]
fn helper_ran(charm_context: &CharmContext, count: u32) -> Result<(), StepError> {
    let calls = charm_context.helper.update_calls();
    if u32::try_from(calls).ok() == Some(count) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected {count} configuration updates, got {calls}"
    )))
}

#[then("the unit is marked installed")]
fn unit_installed(charm_context: &CharmContext) -> Result<(), StepError> {
    if charm_context.store.stored().installed {
        return Ok(());
    }
    Err(StepError::Assertion(String::from(
        "installed flag should be persisted",
    )))
}

#[then("the unit reports \"{message}\"")]
fn unit_reports(charm_context: &CharmContext, message: String) -> Result<(), StepError> {
    let statuses = charm_context.env.statuses();
    let Some((status, reported)) = statuses.last() else {
        return Err(StepError::Assertion(String::from("no status was reported")));
    };
    if reported != &message {
        return Err(StepError::Assertion(format!(
            "expected status message {message:?}, got {reported:?}"
        )));
    }
    let expected = if message == "Unit is ready" {
        WorkloadStatus::Active
    } else {
        WorkloadStatus::Maintenance
    };
    if *status != expected {
        return Err(StepError::Assertion(format!(
            "expected {expected} status, got {status}"
        )));
    }
    Ok(())
}

#[then("\"{hook}\" is waiting for re-delivery")]
fn hook_deferred(charm_context: &CharmContext, hook: String) -> Result<(), StepError> {
    let expected = lifecycle_hook(hook.trim());
    let deferred = charm_context.store.stored().deferred;
    if deferred == vec![expected] {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected only {hook} to be deferred, got {deferred:?}"
    )))
}

#[then("no events are waiting for re-delivery")]
fn nothing_deferred(charm_context: &CharmContext) -> Result<(), StepError> {
    let deferred = charm_context.store.stored().deferred;
    if deferred.is_empty() {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected an empty queue, got {deferred:?}"
    )))
}

#[then("the action result \"{key}\" is \"{value}\"")]
fn action_result_is(
    charm_context: &CharmContext,
    key: String,
    value: String,
) -> Result<(), StepError> {
    let results = charm_context
        .env
        .last_results()
        .ok_or_else(|| StepError::Assertion(String::from("no action results were set")))?;
    let actual = results.get(key.trim()).cloned();
    if actual == Some(Value::String(value.clone())) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected {key} to be {value:?}, got {actual:?}"
    )))
}

#[then("the action error result mentions \"{text}\"")]
fn error_result_mentions(charm_context: &CharmContext, text: String) -> Result<(), StepError> {
    let results = charm_context
        .env
        .last_results()
        .ok_or_else(|| StepError::Assertion(String::from("no action results were set")))?;
    let message = results.get("error").and_then(Value::as_str).unwrap_or_default();
    if message.contains(text.trim()) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "error result {message:?} should mention {text:?}"
    )))
}

#[then("test instances were requested on nodes \"{nodes}\"")]
fn instances_requested(charm_context: &CharmContext, nodes: String) -> Result<(), StepError> {
    let requests = charm_context.provisioner.create_requests();
    let Some(request) = requests.last() else {
        return Err(StepError::Assertion(String::from(
            "create routine was not called",
        )));
    };
    if request.nodes == node_list(&nodes) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected nodes {nodes}, got {:?}",
        request.nodes
    )))
}

#[then("instances matching \"{pattern}\" were deleted on nodes \"{nodes}\"")]
fn instances_deleted(
    charm_context: &CharmContext,
    pattern: String,
    nodes: String,
) -> Result<(), StepError> {
    let requests = charm_context.provisioner.delete_requests();
    let expected = (node_list(&nodes), pattern);
    if requests.last() == Some(&expected) {
        return Ok(());
    }
    Err(StepError::Assertion(format!(
        "expected delete request {expected:?}, got {requests:?}"
    )))
}
