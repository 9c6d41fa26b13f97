use crate::error::{ConfigError, Result};
use crate::settings::parser::parse_settings_file;
use crate::settings::types::{LoadedSettings, MergedSettings, WithSource};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the settings file looked up in each directory.
pub const SETTINGS_FILE_NAME: &str = ".modconf.toml";

/// Discover and load all settings files in the cascade.
///
/// The cascade order is:
/// 1. Start from `start_dir` and look for `.modconf.toml`
/// 2. If found and `root = true`, skip to user settings only
/// 3. Otherwise, continue up the directory tree
/// 4. Finally, check ~/.modconf.toml (unless disabled)
///
/// Returns settings in cascade order (most specific first).
pub fn discover_settings(start_dir: &Path) -> Result<Vec<LoadedSettings>> {
	let mut found = Vec::new();

	for dir in start_dir.ancestors() {
		let path = dir.join(SETTINGS_FILE_NAME);
		if !path.is_file() {
			continue;
		}

		debug!(path = %path.display(), "Found settings file");
		let settings = parse_settings_file(&path)?;
		let root = settings.root;
		found.push(LoadedSettings { settings, path });
		if root {
			break;
		}
	}

	if let Some(user) = load_user_settings(&found)? {
		found.push(user);
	}

	Ok(found)
}

/// Load the user's ~/.modconf.toml if it exists and isn't disabled.
fn load_user_settings(existing: &[LoadedSettings]) -> Result<Option<LoadedSettings>> {
	for loaded in existing {
		if let Some(ref env_var) = loaded.settings.user_settings_disable_env_var
			&& is_env_truthy(env_var)
		{
			debug!(env_var = %env_var, "User settings disabled");
			return Ok(None);
		}
	}

	let path = user_settings_path()?;

	// Already part of the directory walk when working under $HOME
	if existing.iter().any(|loaded| loaded.path == path) || !path.is_file() {
		return Ok(None);
	}

	let settings = parse_settings_file(&path)?;
	Ok(Some(LoadedSettings { settings, path }))
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Merge settings files into the effective settings.
///
/// `config-directory` comes from the most specific file that sets it;
/// `enable-dangerous` lists are joined.
pub fn merge_settings(found: &[LoadedSettings]) -> MergedSettings {
	let mut merged = MergedSettings::default();

	for loaded in found {
		if merged.config_directory.is_none()
			&& let Some(directory) = loaded.config_directory()
		{
			merged.config_directory = Some(WithSource {
				value: directory,
				source: loaded.path.clone(),
			});
		}

		for name in &loaded.settings.enable_dangerous {
			let name = name.trim();
			if !merged.enable_dangerous.iter().any(|known| known.value == name) {
				merged.enable_dangerous.push(WithSource {
					value: name.to_string(),
					source: loaded.path.clone(),
				});
			}
		}
	}

	merged
}

/// Convenience function to discover, load, and merge settings from a directory.
pub fn load_merged_settings(start_dir: &Path) -> Result<MergedSettings> {
	let found = discover_settings(start_dir)?;
	Ok(merge_settings(&found))
}

/// Get the path to the user's settings file.
pub fn user_settings_path() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(ConfigError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(SETTINGS_FILE_NAME))
}
