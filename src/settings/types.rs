use crate::error::{ConfigError, Result};
use crate::facade::ModularConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Top-level settings from a `.modconf.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
	/// If true, stop directory cascade and jump directly to ~/.modconf.toml.
	#[serde(default)]
	pub root: bool,

	/// Environment variable name that, if truthy, skips ~/.modconf.toml lookup.
	/// Useful for CI environments.
	#[serde(default)]
	pub user_settings_disable_env_var: Option<String>,

	/// Base directory for relative config paths, relative to this file.
	#[serde(default)]
	pub config_directory: Option<PathBuf>,

	/// Loaders whose dangerous variant is switched on.
	#[serde(default)]
	pub enable_dangerous: Vec<String>,
}

impl Settings {
	pub fn validate(&self, path: &Path) -> Result<()> {
		let invalid = |reason: &str| ConfigError::InvalidSettings {
			path: path.to_path_buf(),
			reason: reason.to_string(),
		};

		if self
			.config_directory
			.as_ref()
			.is_some_and(|dir| dir.as_os_str().is_empty())
		{
			return Err(invalid("config-directory is empty"));
		}
		if self.enable_dangerous.iter().any(|name| name.trim().is_empty()) {
			return Err(invalid("enable-dangerous contains an empty loader name"));
		}
		Ok(())
	}
}

/// Settings with the file they were loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
	pub settings: Settings,
	pub path: PathBuf,
}

impl LoadedSettings {
	/// `config-directory`, resolved against the directory holding the file.
	pub fn config_directory(&self) -> Option<PathBuf> {
		let directory = self.settings.config_directory.as_ref()?;
		Some(match self.path.parent() {
			Some(parent) => parent.join(directory),
			None => directory.clone(),
		})
	}
}

/// A value together with the settings file that provided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithSource<T> {
	pub value: T,
	pub source: PathBuf,
}

/// Effective settings of a cascade.
#[derive(Debug, Clone, Default)]
pub struct MergedSettings {
	/// From the most specific file that sets it.
	pub config_directory: Option<WithSource<PathBuf>>,

	/// Union over the cascade, first occurrence kept.
	pub enable_dangerous: Vec<WithSource<String>>,
}

impl MergedSettings {
	/// Configure a [`ModularConfig`] from these settings.
	///
	/// Loader names the registry doesn't know, or that have no dangerous
	/// variant, are skipped with a warning.
	pub fn apply(&self, config: &mut ModularConfig) {
		if let Some(ref directory) = self.config_directory {
			config.set_config_directory(&directory.value);
		}
		for name in &self.enable_dangerous {
			if let Err(e) = config.set_dangerous(&name.value, true) {
				warn!(source = %name.source.display(), "Ignoring enable-dangerous entry: {e}");
			}
		}
	}
}
