//! Unit state persisted between hook invocations.
//!
//! Every hook runs in a fresh process, so anything the charm must remember
//! is written to `.unit-state.json` in the state directory. Besides the
//! installed flag this holds the queue of deferred lifecycle events, which
//! are re-delivered at the start of the next dispatch.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::LifecycleHook;

/// File name of the persisted state inside the state directory.
pub const STATE_FILE_NAME: &str = ".unit-state.json";

const STATE_TEMP_FILE_NAME: &str = ".unit-state.json.tmp";

/// State that survives across hook invocations.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct StoredState {
    /// Set once the install hook has configured the tool.
    #[serde(default)]
    pub installed: bool,
    /// Lifecycle events awaiting re-delivery, oldest first.
    #[serde(default)]
    pub deferred: Vec<LifecycleHook>,
}

impl StoredState {
    /// Queues `hook` for re-delivery unless it is already queued.
    pub fn defer(&mut self, hook: LifecycleHook) {
        if !self.deferred.contains(&hook) {
            self.deferred.push(hook);
        }
    }

    /// Removes and returns every queued event.
    pub fn take_deferred(&mut self) -> Vec<LifecycleHook> {
        std::mem::take(&mut self.deferred)
    }
}

/// Errors raised while loading or saving state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the state file does not decode.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Storage for [`StoredState`].
pub trait StateStore {
    /// Loads the persisted state, returning the default when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the state cannot be read or decoded.
    fn load(&self) -> Result<StoredState, StateError>;

    /// Persists `state`, replacing what was stored before.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the state cannot be written.
    fn save(&self, state: &StoredState) -> Result<(), StateError>;
}

/// Stores state as JSON in a directory on disk.
#[derive(Clone, Debug)]
pub struct FileStateStore {
    dir: Utf8PathBuf,
}

impl FileStateStore {
    /// Creates a store writing to `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the state file.
    #[must_use]
    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(STATE_FILE_NAME)
    }

    fn io_error(path: &Utf8Path, err: &io::Error) -> StateError {
        StateError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<StoredState, StateError> {
        let dir = match Dir::open_ambient_dir(&self.dir, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(StoredState::default()),
            Err(err) => return Err(Self::io_error(&self.dir, &err)),
        };

        let path = self.path();
        let contents = match dir.read_to_string(STATE_FILE_NAME) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(StoredState::default()),
            Err(err) => return Err(Self::io_error(&path, &err)),
        };

        if contents.trim().is_empty() {
            return Ok(StoredState::default());
        }

        serde_json::from_str(&contents).map_err(|err| StateError::Parse {
            path,
            message: err.to_string(),
        })
    }

    fn save(&self, state: &StoredState) -> Result<(), StateError> {
        Dir::create_ambient_dir_all(&self.dir, ambient_authority())
            .map_err(|err| Self::io_error(&self.dir, &err))?;
        let dir = Dir::open_ambient_dir(&self.dir, ambient_authority())
            .map_err(|err| Self::io_error(&self.dir, &err))?;

        let path = self.path();
        let rendered = serde_json::to_string_pretty(state).map_err(|err| StateError::Parse {
            path: path.clone(),
            message: err.to_string(),
        })?;

        // A partial write only ever touches the temp file.
        let temp_path = self.dir.join(STATE_TEMP_FILE_NAME);
        dir.write(STATE_TEMP_FILE_NAME, rendered)
            .map_err(|err| Self::io_error(&temp_path, &err))?;
        dir.rename(STATE_TEMP_FILE_NAME, &dir, STATE_FILE_NAME)
            .map_err(|err| Self::io_error(&path, &err))
    }
}

#[cfg(test)]
mod tests;
