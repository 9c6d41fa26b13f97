//! Settings for the command-line tool.
//!
//! This module handles:
//! - TOML settings file parsing
//! - Directory cascade discovery
//! - Merging and applying settings to a [`crate::ModularConfig`]

pub mod cascade;
pub mod parser;
pub mod types;

pub use cascade::{
	SETTINGS_FILE_NAME, discover_settings, load_merged_settings, merge_settings,
	user_settings_path,
};
pub use parser::{parse_settings_file, parse_settings_str};
pub use types::{LoadedSettings, MergedSettings, Settings, WithSource};
