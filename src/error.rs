use std::path::PathBuf;

/// Boxed error used as the source of a failed decode.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while decoding the content of a single file.
///
/// Every variant is a loading error: the auto-detect sequence treats all of
/// them as "this loader did not work" and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	#[error("{message}")]
	Loading {
		message: String,
		#[source]
		source: Option<BoxError>,
	},

	#[error("no loader registered for type '{name}'")]
	Missing { name: String },

	#[error("'{name}' loader is disabled, enable its dangerous flag to use it")]
	Disabled { name: String },

	#[error("malformed options in '{type_string}': {reason}")]
	OptionParse { type_string: String, reason: String },

	#[error("{message} ({} attempts failed)", attempts.len())]
	Aggregate {
		message: String,
		attempts: Vec<Attempt>,
	},
}

/// One failed try inside an aggregated error.
#[derive(Debug)]
pub struct Attempt {
	/// Name of the loader that was tried.
	pub loader: String,

	/// Why it failed.
	pub error: LoadError,
}

impl LoadError {
	pub fn loading(message: impl Into<String>) -> Self {
		LoadError::Loading {
			message: message.into(),
			source: None,
		}
	}

	pub fn loading_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
		LoadError::Loading {
			message: message.into(),
			source: Some(source.into()),
		}
	}

	pub fn option_parse(type_string: impl Into<String>, reason: impl Into<String>) -> Self {
		LoadError::OptionParse {
			type_string: type_string.into(),
			reason: reason.into(),
		}
	}

	/// Per-attempt failures, empty unless this is an aggregate.
	pub fn attempts(&self) -> &[Attempt] {
		match self {
			LoadError::Aggregate { attempts, .. } => attempts,
			_ => &[],
		}
	}
}

/// Library-level structured errors for modconf.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{path} does not refer to any file")]
	ConfigFileNotFound { path: PathBuf },

	#[error("can't find the config {attribute} in {file}")]
	ConfigNotFound { file: PathBuf, attribute: String },

	#[error("failed to read {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to load {path}")]
	Load {
		path: PathBuf,
		#[source]
		source: LoadError,
	},

	#[error("{path} and {root} have different anchors")]
	DifferentAnchors { path: PathBuf, root: PathBuf },

	#[error("loader '{name}' defines no decode function")]
	NoDecodeFunction { name: String },

	#[error("unknown loader: {name}")]
	UnknownLoader { name: String },

	#[error("loader '{name}' has no dangerous variant")]
	NotDangerous { name: String },

	#[error("failed to read settings file: {path}")]
	SettingsRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse settings file: {path}")]
	SettingsParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid settings in {path}: {reason}")]
	InvalidSettings { path: PathBuf, reason: String },

	#[error("failed to resolve home directory")]
	HomeDirectoryNotFound,
}

impl ConfigError {
	/// True for both the missing-file and the missing-attribute case.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			ConfigError::ConfigFileNotFound { .. } | ConfigError::ConfigNotFound { .. }
		)
	}

	/// The decode failure behind a `Load` error.
	pub fn load_error(&self) -> Option<&LoadError> {
		match self {
			ConfigError::Load { source, .. } => Some(source),
			_ => None,
		}
	}
}

/// Result type alias using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;
