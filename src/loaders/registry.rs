use crate::error::{ConfigError, LoadError, Result};
use crate::loaders::builtin;
use crate::loaders::options::Options;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Loaders tried, in order, on files without a `#type:` header.
///
/// `text` never fails, so the sequence always terminates with a value.
pub const AUTO_DETECT_ORDER: [&str; 6] = ["number", "bool", "none", "yaml", "python", "text"];

/// Something that turns the text of a file into a [`Value`].
///
/// Any `Fn(&str, &Options) -> Result<Value, LoadError>` is a decoder.
pub trait Decoder: Send + Sync {
	fn decode(&self, text: &str, options: &Options) -> std::result::Result<Value, LoadError>;
}

impl<F> Decoder for F
where
	F: Fn(&str, &Options) -> std::result::Result<Value, LoadError> + Send + Sync,
{
	fn decode(&self, text: &str, options: &Options) -> std::result::Result<Value, LoadError> {
		self(text, options)
	}
}

/// Description of a loader to register.
///
/// At least one of [`Loader::safe`] or [`Loader::dangerous`] must be set.
pub struct Loader {
	name: String,
	aliases: Vec<String>,
	safe: Option<Arc<dyn Decoder>>,
	dangerous: Option<Arc<dyn Decoder>>,
	dangerous_default: bool,
}

impl Loader {
	pub fn new(name: impl Into<String>) -> Self {
		Loader {
			name: name.into(),
			aliases: Vec::new(),
			safe: None,
			dangerous: None,
			dangerous_default: false,
		}
	}

	/// Another name the loader answers to in headers.
	pub fn alias(mut self, alias: impl Into<String>) -> Self {
		self.aliases.push(alias.into());
		self
	}

	/// The decoder used while the dangerous flag is off.
	pub fn safe(mut self, decoder: impl Decoder + 'static) -> Self {
		self.safe = Some(Arc::new(decoder));
		self
	}

	/// The decoder used while the dangerous flag is on.
	pub fn dangerous(mut self, decoder: impl Decoder + 'static) -> Self {
		self.dangerous = Some(Arc::new(decoder));
		self
	}

	/// Initial value of the dangerous flag.
	pub fn dangerous_by_default(mut self, enabled: bool) -> Self {
		self.dangerous_default = enabled;
		self
	}

	fn into_entry(self) -> Result<LoaderEntry> {
		if self.safe.is_none() && self.dangerous.is_none() {
			return Err(ConfigError::NoDecodeFunction { name: self.name });
		}
		Ok(LoaderEntry {
			dangerous_enabled: self.dangerous_default && self.dangerous.is_some(),
			name: self.name,
			aliases: self.aliases,
			safe: self.safe,
			dangerous: self.dangerous,
		})
	}
}

/// A registered loader.
pub struct LoaderEntry {
	name: String,
	aliases: Vec<String>,
	safe: Option<Arc<dyn Decoder>>,
	dangerous: Option<Arc<dyn Decoder>>,
	dangerous_enabled: bool,
}

impl LoaderEntry {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn aliases(&self) -> &[String] {
		&self.aliases
	}

	pub fn has_safe(&self) -> bool {
		self.safe.is_some()
	}

	pub fn has_dangerous(&self) -> bool {
		self.dangerous.is_some()
	}

	pub fn dangerous_enabled(&self) -> bool {
		self.dangerous_enabled
	}

	/// Decode with the variant selected by the current flag value.
	pub fn decode(&self, text: &str, options: &Options) -> std::result::Result<Value, LoadError> {
		if self.dangerous_enabled
			&& let Some(ref dangerous) = self.dangerous
		{
			return dangerous.decode(text, options);
		}
		match self.safe {
			Some(ref safe) => safe.decode(text, options),
			None => Err(LoadError::Disabled {
				name: self.name.clone(),
			}),
		}
	}
}

impl fmt::Debug for LoaderEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoaderEntry")
			.field("name", &self.name)
			.field("aliases", &self.aliases)
			.field("safe", &self.has_safe())
			.field("dangerous", &self.has_dangerous())
			.field("dangerous_enabled", &self.dangerous_enabled)
			.finish()
	}
}

/// Maps type names and aliases to loaders.
#[derive(Debug)]
pub struct LoaderRegistry {
	entries: Vec<LoaderEntry>,
	names: HashMap<String, usize>,
}

impl Default for LoaderRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl LoaderRegistry {
	/// A registry with no loaders at all.
	pub fn empty() -> Self {
		LoaderRegistry {
			entries: Vec::new(),
			names: HashMap::new(),
		}
	}

	/// A registry holding every built-in loader.
	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		for loader in builtin::builtin_loaders() {
			// Built-ins always carry a decoder
			if let Ok(entry) = loader.into_entry() {
				registry.insert(entry);
			}
		}
		registry
	}

	/// Register a loader under its name and aliases.
	///
	/// Registering an existing name rebinds it to the new loader.
	pub fn register(&mut self, loader: Loader) -> Result<()> {
		let entry = loader.into_entry()?;
		info!(
			loader = %entry.name,
			aliases = ?entry.aliases,
			dangerous = entry.has_dangerous(),
			"Adding loader"
		);
		self.insert(entry);
		Ok(())
	}

	fn insert(&mut self, entry: LoaderEntry) {
		let index = self.entries.len();
		self.names.insert(entry.name.clone(), index);
		for alias in &entry.aliases {
			self.names.insert(alias.clone(), index);
		}
		self.entries.push(entry);
	}

	/// Find the loader registered under a name or alias.
	pub fn resolve(&self, name: &str) -> Option<&LoaderEntry> {
		self.names.get(name).map(|&index| &self.entries[index])
	}

	/// Turn the dangerous variant of a loader on or off.
	pub fn set_dangerous(&mut self, name: &str, enabled: bool) -> Result<()> {
		let index = *self
			.names
			.get(name)
			.ok_or_else(|| ConfigError::UnknownLoader {
				name: name.to_string(),
			})?;
		let entry = &mut self.entries[index];
		if entry.dangerous.is_none() {
			return Err(ConfigError::NotDangerous {
				name: name.to_string(),
			});
		}
		info!(loader = %entry.name, enabled, "Setting dangerous flag");
		entry.dangerous_enabled = enabled;
		Ok(())
	}

	/// Current dangerous flag of a loader, `None` if the name is unknown.
	pub fn is_dangerous_enabled(&self, name: &str) -> Option<bool> {
		self.resolve(name).map(LoaderEntry::dangerous_enabled)
	}

	/// Loaders still bound to their own name, in registration order.
	pub fn loaders(&self) -> impl Iterator<Item = &LoaderEntry> {
		self.entries
			.iter()
			.enumerate()
			.filter(|(index, entry)| self.names.get(&entry.name) == Some(index))
			.map(|(_, entry)| entry)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn constant(text: &'static str) -> impl Decoder {
		move |_: &str, _: &Options| -> std::result::Result<Value, LoadError> {
			Ok(Value::from(text))
		}
	}

	#[test]
	fn test_register_requires_a_decoder() {
		let mut registry = LoaderRegistry::empty();
		let err = registry.register(Loader::new("nothing")).unwrap_err();
		match err {
			ConfigError::NoDecodeFunction { name } => assert_eq!(name, "nothing"),
			other => panic!("Expected NoDecodeFunction error, got {other:?}"),
		}
	}

	#[test]
	fn test_aliases_resolve_to_same_entry() {
		let mut registry = LoaderRegistry::empty();
		registry
			.register(Loader::new("upper").alias("up").safe(
				|text: &str, _: &Options| -> std::result::Result<Value, LoadError> {
					Ok(Value::from(text.to_uppercase()))
				},
			))
			.unwrap();

		let options = Options::new();
		for name in ["upper", "up"] {
			let entry = registry.resolve(name).unwrap();
			assert_eq!(entry.name(), "upper");
			assert_eq!(entry.decode("abc", &options).unwrap(), Value::from("ABC"));
		}
		assert!(registry.resolve("down").is_none());
	}

	#[test]
	fn test_dangerous_only_is_disabled_by_default() {
		let mut registry = LoaderRegistry::empty();
		registry
			.register(Loader::new("exec").dangerous(constant("ran")))
			.unwrap();

		let entry = registry.resolve("exec").unwrap();
		match entry.decode("", &Options::new()).unwrap_err() {
			LoadError::Disabled { name } => assert_eq!(name, "exec"),
			other => panic!("Expected Disabled error, got {other:?}"),
		}

		registry.set_dangerous("exec", true).unwrap();
		let entry = registry.resolve("exec").unwrap();
		assert_eq!(entry.decode("", &Options::new()).unwrap(), Value::from("ran"));
	}

	#[test]
	fn test_flag_is_read_at_call_time() {
		let mut registry = LoaderRegistry::empty();
		registry
			.register(
				Loader::new("dual")
					.safe(constant("safe"))
					.dangerous(constant("dangerous"))
					.dangerous_by_default(true),
			)
			.unwrap();

		let options = Options::new();
		assert_eq!(
			registry.resolve("dual").unwrap().decode("", &options).unwrap(),
			Value::from("dangerous")
		);
		registry.set_dangerous("dual", false).unwrap();
		assert_eq!(
			registry.resolve("dual").unwrap().decode("", &options).unwrap(),
			Value::from("safe")
		);
		assert_eq!(registry.is_dangerous_enabled("dual"), Some(false));
	}

	#[test]
	fn test_set_dangerous_errors() {
		let mut registry = LoaderRegistry::empty();
		registry.register(Loader::new("plain").safe(constant("x"))).unwrap();

		assert!(matches!(
			registry.set_dangerous("missing", true).unwrap_err(),
			ConfigError::UnknownLoader { .. }
		));
		assert!(matches!(
			registry.set_dangerous("plain", true).unwrap_err(),
			ConfigError::NotDangerous { .. }
		));
	}

	#[test]
	fn test_reregistering_rebinds_name() {
		let mut registry = LoaderRegistry::empty();
		registry.register(Loader::new("v").safe(constant("one"))).unwrap();
		registry.register(Loader::new("v").safe(constant("two"))).unwrap();

		assert_eq!(
			registry.resolve("v").unwrap().decode("", &Options::new()).unwrap(),
			Value::from("two")
		);
		assert_eq!(registry.loaders().count(), 1);
	}

	#[test]
	fn test_builtins_cover_auto_detect_order() {
		let registry = LoaderRegistry::with_builtins();
		for name in AUTO_DETECT_ORDER {
			assert!(registry.resolve(name).is_some(), "missing built-in {name}");
		}
		for name in [
			"int", "integer", "float", "real", "complex", "number", "num", "bool", "boolean",
			"none", "null", "json", "yaml", "text", "base64", "b64", "python", "ini", "inifile",
			"winconfig", "toml",
		] {
			assert!(registry.resolve(name).is_some(), "missing built-in {name}");
		}
		assert_eq!(registry.is_dangerous_enabled("python"), Some(false));
		assert_eq!(registry.is_dangerous_enabled("yaml"), Some(false));
	}
}
