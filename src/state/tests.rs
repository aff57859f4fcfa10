//! Unit tests for the state module.

use super::*;
use rstest::rstest;
use tempfile::TempDir;

fn temp_store(tmp: &TempDir) -> FileStateStore {
    let dir = Utf8PathBuf::from_path_buf(tmp.path().join("state"))
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    FileStateStore::new(dir)
}

#[rstest]
fn load_returns_default_when_directory_is_missing() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);

    let state = store.load().unwrap_or_else(|err| panic!("load: {err}"));

    assert_eq!(state, StoredState::default());
    assert!(!state.installed);
}

#[rstest]
fn save_then_load_preserves_installed_flag_and_queue() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);
    let mut state = StoredState {
        installed: true,
        ..StoredState::default()
    };
    state.defer(LifecycleHook::ConfigChanged);

    store
        .save(&state)
        .unwrap_or_else(|err| panic!("save: {err}"));
    let loaded = store.load().unwrap_or_else(|err| panic!("load: {err}"));

    assert_eq!(loaded, state);
}

#[rstest]
fn saved_state_uses_hook_names() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);
    let mut state = StoredState::default();
    state.defer(LifecycleHook::ConfigChanged);
    store
        .save(&state)
        .unwrap_or_else(|err| panic!("save: {err}"));

    let raw = std::fs::read_to_string(store.path()).unwrap_or_else(|err| panic!("read: {err}"));

    assert!(raw.contains("\"config-changed\""), "state file: {raw}");
}

#[rstest]
fn save_replaces_existing_state_without_leaving_temp_files() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);
    let state_dir = tmp.path().join("state");
    std::fs::create_dir_all(&state_dir).unwrap_or_else(|err| panic!("mkdir: {err}"));
    std::fs::write(store.path(), "{not json").unwrap_or_else(|err| panic!("write: {err}"));
    std::fs::write(state_dir.join(".unit-state.json.tmp"), "partial")
        .unwrap_or_else(|err| panic!("write: {err}"));
    let state = StoredState {
        installed: true,
        ..StoredState::default()
    };

    store
        .save(&state)
        .unwrap_or_else(|err| panic!("save: {err}"));

    let loaded = store.load().unwrap_or_else(|err| panic!("load: {err}"));
    assert_eq!(loaded, state);
    let entries = std::fs::read_dir(&state_dir)
        .unwrap_or_else(|err| panic!("read_dir: {err}"))
        .map(|entry| {
            entry
                .unwrap_or_else(|err| panic!("entry: {err}"))
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect::<Vec<_>>();
    assert_eq!(entries, vec![String::from(".unit-state.json")]);
}

#[rstest]
fn load_rejects_corrupt_state() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);
    std::fs::create_dir_all(tmp.path().join("state")).unwrap_or_else(|err| panic!("mkdir: {err}"));
    std::fs::write(store.path(), "{not json").unwrap_or_else(|err| panic!("write: {err}"));

    let err = store.load().expect_err("corrupt state should fail");

    assert!(matches!(err, StateError::Parse { .. }), "unexpected: {err}");
}

#[rstest]
fn load_treats_empty_file_as_default() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = temp_store(&tmp);
    std::fs::create_dir_all(tmp.path().join("state")).unwrap_or_else(|err| panic!("mkdir: {err}"));
    std::fs::write(store.path(), "\n").unwrap_or_else(|err| panic!("write: {err}"));

    let state = store.load().unwrap_or_else(|err| panic!("load: {err}"));

    assert_eq!(state, StoredState::default());
}

#[rstest]
fn defer_queues_each_hook_once() {
    let mut state = StoredState::default();

    state.defer(LifecycleHook::ConfigChanged);
    state.defer(LifecycleHook::ConfigChanged);
    assert_eq!(state.deferred, vec![LifecycleHook::ConfigChanged]);
}

#[rstest]
fn take_deferred_drains_the_queue() {
    let mut state = StoredState::default();
    state.defer(LifecycleHook::ConfigChanged);

    let drained = state.take_deferred();

    assert_eq!(drained, vec![LifecycleHook::ConfigChanged]);
    assert!(state.deferred.is_empty());
}
