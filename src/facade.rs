//! Reading configuration by path.
//!
//! [`ModularConfig`] bundles a loader registry, a config tree and the
//! directory relative paths are resolved against. A shared instance backs
//! the free functions re-exported at the crate root.

use crate::error::Result;
use crate::loaders::{Loader, LoaderRegistry};
use crate::tree::{ConfigTree, resolve_path, split_real_path};
use crate::value::Value;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Configuration read from a directory hierarchy.
///
/// ```no_run
/// use modconf::ModularConfig;
///
/// let mut config = ModularConfig::new();
/// config.set_config_directory("/etc/myapp");
/// let host = config.get("settings.json/database/host")?;
/// # Ok::<(), modconf::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct ModularConfig {
	registry: LoaderRegistry,
	tree: ConfigTree,
	config_directory: PathBuf,
}

impl Default for ModularConfig {
	fn default() -> Self {
		Self::new()
	}
}

impl ModularConfig {
	/// An instance with the built-in loaders, reading relative to the
	/// working directory.
	pub fn new() -> Self {
		Self::with_registry(LoaderRegistry::with_builtins())
	}

	pub fn with_registry(registry: LoaderRegistry) -> Self {
		let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
		ModularConfig {
			registry,
			tree: ConfigTree::new(),
			config_directory: resolve_path(&cwd, Path::new("")),
		}
	}

	/// Value at `path`: a directory, a file, or keys inside a file.
	pub fn get(&mut self, path: impl AsRef<Path>) -> Result<Value> {
		let path = self.resolve(path);
		debug!(path = %path.display(), "Getting config");
		self.tree.get(&self.registry, &path)
	}

	/// Load the file or directory behind `path`, re-reading it if `reload`.
	pub fn ensure(&mut self, path: impl AsRef<Path>, reload: bool) -> Result<()> {
		let path = self.resolve(path);
		let (real, _) = split_real_path(&path)?;
		self.tree.ensure_loaded(&self.registry, &real, reload)
	}

	/// Absolute form of `path`, relative paths taken from the config directory.
	pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
		resolve_path(&self.config_directory, path.as_ref())
	}

	/// Change the base of relative paths. Loaded content is kept.
	pub fn set_config_directory(&mut self, path: impl AsRef<Path>) {
		let directory = self.resolve(path);
		self.replace_config_directory(directory);
	}

	fn replace_config_directory(&mut self, directory: PathBuf) -> PathBuf {
		debug!(directory = %directory.display(), "Setting config directory");
		std::mem::replace(&mut self.config_directory, directory)
	}

	pub fn config_directory(&self) -> &Path {
		&self.config_directory
	}

	/// Use another config directory until the returned scope is dropped.
	pub fn scoped_directory(&mut self, path: impl AsRef<Path>) -> DirectoryScope<'_> {
		let directory = self.resolve(path);
		let previous = self.replace_config_directory(directory);
		DirectoryScope {
			config: self,
			previous: Some(previous),
		}
	}

	pub fn registry(&self) -> &LoaderRegistry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut LoaderRegistry {
		&mut self.registry
	}

	pub fn set_dangerous(&mut self, name: &str, enabled: bool) -> Result<()> {
		self.registry.set_dangerous(name, enabled)
	}

	pub fn register_loader(&mut self, loader: Loader) -> Result<()> {
		self.registry.register(loader)
	}

	pub fn tree(&self) -> &ConfigTree {
		&self.tree
	}
}

/// A [`ModularConfig`] borrowed with a temporary config directory.
///
/// The previous directory comes back when the scope is dropped.
#[derive(Debug)]
pub struct DirectoryScope<'a> {
	config: &'a mut ModularConfig,
	previous: Option<PathBuf>,
}

impl Deref for DirectoryScope<'_> {
	type Target = ModularConfig;

	fn deref(&self) -> &ModularConfig {
		self.config
	}
}

impl DerefMut for DirectoryScope<'_> {
	fn deref_mut(&mut self) -> &mut ModularConfig {
		self.config
	}
}

impl Drop for DirectoryScope<'_> {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			self.config.replace_config_directory(previous);
		}
	}
}

static DEFAULT: LazyLock<Mutex<ModularConfig>> = LazyLock::new(|| Mutex::new(ModularConfig::new()));

/// Lock the shared instance used by the free functions.
pub fn default_instance() -> MutexGuard<'static, ModularConfig> {
	DEFAULT.lock()
}

/// [`ModularConfig::get`] on the shared instance.
pub fn get(path: impl AsRef<Path>) -> Result<Value> {
	DEFAULT.lock().get(path)
}

/// [`ModularConfig::ensure`] on the shared instance.
pub fn ensure(path: impl AsRef<Path>, reload: bool) -> Result<()> {
	DEFAULT.lock().ensure(path, reload)
}

pub fn set_config_directory(path: impl AsRef<Path>) {
	DEFAULT.lock().set_config_directory(path)
}

pub fn get_config_directory() -> PathBuf {
	DEFAULT.lock().config_directory().to_path_buf()
}

pub fn set_dangerous(name: &str, enabled: bool) -> Result<()> {
	DEFAULT.lock().set_dangerous(name, enabled)
}

pub fn register_loader(loader: Loader) -> Result<()> {
	DEFAULT.lock().register_loader(loader)
}

/// Switch the shared instance's config directory until the guard drops.
///
/// The lock is not held in between, so other calls can use the instance.
pub fn using_config_directory(path: impl AsRef<Path>) -> ConfigDirectoryGuard {
	let mut config = DEFAULT.lock();
	let directory = config.resolve(path);
	ConfigDirectoryGuard {
		previous: Some(config.replace_config_directory(directory)),
	}
}

/// Restores the shared instance's previous config directory on drop.
#[derive(Debug)]
#[must_use = "the directory is restored as soon as the guard is dropped"]
pub struct ConfigDirectoryGuard {
	previous: Option<PathBuf>,
}

impl Drop for ConfigDirectoryGuard {
	fn drop(&mut self) {
		if let Some(previous) = self.previous.take() {
			DEFAULT.lock().replace_config_directory(previous);
		}
	}
}
