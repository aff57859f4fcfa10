//! Charm options and runtime settings.
//!
//! [`CharmConfig`] mirrors the options declared in `config.yaml` and is read
//! from `config-get`. [`RuntimeConfig`] holds settings for the hook binary
//! itself and is loaded via `ortho-config` from defaults, configuration files,
//! and `CLOUDSUPPORT_*` environment variables.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default vCPU count for test instances.
pub const DEFAULT_VCPUS: u32 = 1;

/// Default directory holding the managed tool's configuration.
pub const DEFAULT_TOOL_CONFIG_DIR: &str = "/etc/cloudsupport";

/// Default OpenStack testing executable.
pub const DEFAULT_OS_TESTING_BIN: &str = "os-testing";

/// Charm options as reported by `config-get --format=json`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CharmConfig {
    /// vCPU count used when the action does not override it.
    #[serde(default = "default_vcpus")]
    pub vcpus: u32,
    /// Glance image name for test instances.
    #[serde(default)]
    pub image: String,
    /// Prefix applied to test instance names.
    #[serde(default)]
    pub name_prefix: String,
    /// Subnet CIDR for the test network.
    #[serde(default)]
    pub cidr: String,
    /// Contents of `clouds.yaml` with the OpenStack credentials.
    #[serde(default)]
    pub clouds_yaml: Option<String>,
    /// Cloud entry within `clouds.yaml` to use.
    #[serde(default)]
    pub cloud_name: Option<String>,
}

const fn default_vcpus() -> u32 {
    DEFAULT_VCPUS
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            vcpus: DEFAULT_VCPUS,
            image: String::from("cirros"),
            name_prefix: String::from("cloudsupport-test"),
            cidr: String::from("172.16.0.0/24"),
            clouds_yaml: None,
            cloud_name: None,
        }
    }
}

/// Settings for the hook binary loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CLOUDSUPPORT",
    discovery(
        app_name = "cloudsupport-charm",
        env_var = "CLOUDSUPPORT_CONFIG_PATH",
        config_file_name = "cloudsupport-charm.toml",
        dotfile_name = ".cloudsupport-charm.toml",
        project_file_name = "cloudsupport-charm.toml"
    )
)]
pub struct RuntimeConfig {
    /// Directory holding the persisted unit state. Juju runs hooks from the
    /// charm directory, so the default keeps state alongside the charm.
    #[ortho_config(default = ".".to_owned())]
    pub state_dir: String,
    /// Directory the managed tool reads its configuration from.
    #[ortho_config(default = DEFAULT_TOOL_CONFIG_DIR.to_owned())]
    pub tool_config_dir: String,
    /// Directory containing the Juju hook tools. When unset the tools are
    /// resolved on `PATH`.
    pub hook_tools_dir: Option<String>,
    /// Path to the OpenStack testing executable.
    #[ortho_config(default = DEFAULT_OS_TESTING_BIN.to_owned())]
    pub os_testing_bin: String,
}

/// Errors raised when loading or validating [`RuntimeConfig`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RuntimeConfigError {
    /// Raised when a required value is blank.
    #[error("missing {field}: set CLOUDSUPPORT_{env_suffix} or add {field} to cloudsupport-charm.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Indicates that parsing or merging configuration layers failed.
    #[error("runtime configuration parsing failed: {0}")]
    Parse(String),
}

impl RuntimeConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeConfigError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, RuntimeConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("cloudsupport-charm")])
            .map_err(|err| RuntimeConfigError::Parse(err.to_string()))
    }

    /// Ensures configured values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeConfigError::InvalidConfig`] naming the first blank
    /// field.
    pub fn validate(&self) -> Result<(), RuntimeConfigError> {
        Self::require_value(Some(self.state_dir.as_str()), "state_dir")?;
        Self::require_value(Some(self.tool_config_dir.as_str()), "tool_config_dir")?;
        Self::require_value(self.hook_tools_dir.as_deref(), "hook_tools_dir")?;
        Self::require_value(Some(self.os_testing_bin.as_str()), "os_testing_bin")?;
        Ok(())
    }

    fn require_value(value: Option<&str>, field: &str) -> Result<(), RuntimeConfigError> {
        match value {
            None => Ok(()),
            Some(text) if !text.trim().is_empty() => Ok(()),
            Some(_) => Err(RuntimeConfigError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }
}
