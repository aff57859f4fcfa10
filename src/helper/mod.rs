//! Configuration of the managed cloud-support tool.
//!
//! The tool reads OpenStack credentials from `clouds.yaml` and its test
//! instance defaults from `cloudsupport.toml`, both inside the tool
//! configuration directory. Updates are idempotent: files whose rendered
//! content is unchanged are left alone.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::toml;
use thiserror::Error;

use crate::config::CharmConfig;

/// Credentials file consumed by the OpenStack clients.
pub const CLOUDS_FILE_NAME: &str = "clouds.yaml";

/// Settings file consumed by the cloud-support tool.
pub const TOOL_CONFIG_FILE_NAME: &str = "cloudsupport.toml";

const TEST_INSTANCE_SECTION: &str = "test-instance";

/// Errors raised while applying configuration.
#[derive(Debug, Error)]
pub enum HelperError {
    /// Raised when a charm option required by the tool is blank.
    #[error("charm option {option} must not be empty")]
    InvalidConfig {
        /// Charm option name.
        option: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the tool configuration cannot be rendered.
    #[error("failed to render {path}: {message}")]
    Render {
        /// Path that was being rendered.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Applies charm configuration to the managed tool.
pub trait ConfigHelper {
    /// Writes the tool configuration derived from `config`. Returns `true`
    /// when anything on disk changed.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError`] when the configuration is invalid or cannot be
    /// written.
    fn update_config(&self, config: &CharmConfig) -> Result<bool, HelperError>;
}

/// Writes the tool's configuration files.
#[derive(Clone, Debug)]
pub struct CloudSupportHelper {
    config_dir: Utf8PathBuf,
}

impl CloudSupportHelper {
    /// Creates a helper writing into `config_dir`.
    #[must_use]
    pub fn new(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Directory the helper writes into.
    #[must_use]
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    fn open_dir(&self) -> Result<Dir, HelperError> {
        Dir::create_ambient_dir_all(&self.config_dir, ambient_authority())
            .map_err(|err| io_error(&self.config_dir, &err))?;
        Dir::open_ambient_dir(&self.config_dir, ambient_authority())
            .map_err(|err| io_error(&self.config_dir, &err))
    }

    fn write_if_changed(
        &self,
        dir: &Dir,
        file_name: &str,
        contents: &str,
    ) -> Result<bool, HelperError> {
        let path = self.config_dir.join(file_name);
        match dir.read_to_string(file_name) {
            Ok(existing) if existing == contents => return Ok(false),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_error(&path, &err)),
        }

        dir.write(file_name, contents)
            .map_err(|err| io_error(&path, &err))?;
        tracing::info!(%path, "wrote tool configuration");
        Ok(true)
    }

    fn render_tool_config(&self, config: &CharmConfig) -> Result<String, HelperError> {
        let mut section = toml::value::Table::new();
        section.insert(
            String::from("vcpus"),
            toml::Value::Integer(i64::from(config.vcpus)),
        );
        section.insert(
            String::from("image"),
            toml::Value::String(config.image.trim().to_owned()),
        );
        section.insert(
            String::from("name-prefix"),
            toml::Value::String(config.name_prefix.trim().to_owned()),
        );
        section.insert(
            String::from("cidr"),
            toml::Value::String(config.cidr.trim().to_owned()),
        );
        if let Some(cloud) = non_blank(config.cloud_name.as_deref()) {
            section.insert(
                String::from("cloud-name"),
                toml::Value::String(cloud.to_owned()),
            );
        }

        let mut root = toml::value::Table::new();
        root.insert(
            String::from(TEST_INSTANCE_SECTION),
            toml::Value::Table(section),
        );

        toml::to_string_pretty(&toml::Value::Table(root)).map_err(|err| HelperError::Render {
            path: self.config_dir.join(TOOL_CONFIG_FILE_NAME),
            message: err.to_string(),
        })
    }
}

impl ConfigHelper for CloudSupportHelper {
    fn update_config(&self, config: &CharmConfig) -> Result<bool, HelperError> {
        validate(config)?;
        let dir = self.open_dir()?;

        let mut changed = false;
        if let Some(clouds) = non_blank(config.clouds_yaml.as_deref()) {
            changed |= self.write_if_changed(&dir, CLOUDS_FILE_NAME, clouds)?;
        }

        let rendered = self.render_tool_config(config)?;
        changed |= self.write_if_changed(&dir, TOOL_CONFIG_FILE_NAME, &rendered)?;
        Ok(changed)
    }
}

fn validate(config: &CharmConfig) -> Result<(), HelperError> {
    for (option, value) in [
        ("image", &config.image),
        ("name-prefix", &config.name_prefix),
        ("cidr", &config.cidr),
    ] {
        if value.trim().is_empty() {
            return Err(HelperError::InvalidConfig {
                option: option.to_owned(),
            });
        }
    }
    Ok(())
}

fn io_error(path: &Utf8Path, err: &io::Error) -> HelperError {
    HelperError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
