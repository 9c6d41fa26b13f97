use crate::error::{ConfigError, Result};
use crate::loaders::{LoaderRegistry, decode_file};
use crate::tree::node::Node;
use crate::tree::paths::{common_ancestor, split_real_path};
use crate::value::Value;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// The lazily loaded config tree.
///
/// Paths given to this type are absolute and already resolved; see
/// [`crate::tree::resolve_path`].
#[derive(Debug, Default)]
pub struct ConfigTree {
	root: Option<PathBuf>,
	tree: Node,
	loaded: BTreeSet<PathBuf>,
}

impl ConfigTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Directory the tree is rooted at, `None` until something is loaded.
	pub fn common_root(&self) -> Option<&Path> {
		self.root.as_deref()
	}

	/// Paths loaded so far. None of them is an ancestor of another.
	pub fn loaded_paths(&self) -> impl Iterator<Item = &Path> {
		self.loaded.iter().map(PathBuf::as_path)
	}

	/// Whether `path` or one of its ancestors has been loaded.
	pub fn is_loaded(&self, path: &Path) -> bool {
		self.loaded.iter().any(|loaded| path.starts_with(loaded))
	}

	pub fn root_node(&self) -> &Node {
		&self.tree
	}

	/// Load a real file or directory into the tree.
	///
	/// Without `force_reload` nothing is read if `path` is already covered
	/// by a loaded path.
	pub fn ensure_loaded(
		&mut self,
		registry: &LoaderRegistry,
		path: &Path,
		force_reload: bool,
	) -> Result<()> {
		match self.root.clone() {
			None => {
				let root = if path.is_dir() {
					path
				} else {
					path.parent().unwrap_or(path)
				};
				debug!(root = %root.display(), "Rooting config tree");
				self.root = Some(root.to_path_buf());
				self.tree = Node::empty();
			}
			Some(root) if !path.starts_with(&root) => {
				let ancestor = common_ancestor(&root, path)?;
				self.rebase(&ancestor)?;
			}
			Some(_) => {}
		}

		if !force_reload && self.is_loaded(path) {
			debug!(path = %path.display(), "Already loaded");
			return Ok(());
		}

		self.load(registry, path, force_reload)?;
		if !self.is_loaded(path) {
			self.loaded.retain(|loaded| !loaded.starts_with(path));
			self.loaded.insert(path.to_path_buf());
		}
		Ok(())
	}

	/// Value at `path`, loading whatever is needed to reach it.
	pub fn get(&mut self, registry: &LoaderRegistry, path: &Path) -> Result<Value> {
		let (real, remainder) = split_real_path(path)?;
		self.ensure_loaded(registry, &real, false)?;

		let not_found = |attribute: String| ConfigError::ConfigNotFound {
			file: real.clone(),
			attribute,
		};

		let components = self.components(&real);
		if self.tree.lookup(&components).is_none() {
			// Created after its directory was loaded
			self.load(registry, &real, false)?;
		}
		let node = self
			.tree
			.lookup(&components)
			.ok_or_else(|| ConfigError::ConfigFileNotFound { path: real.clone() })?;

		let mut value = match node {
			Node::Leaf(value) => value,
			Node::Branch(_) if remainder.is_empty() => return Ok(node.to_value()),
			Node::Branch(_) => return Err(not_found(remainder.join("/"))),
		};
		for (depth, key) in remainder.iter().enumerate() {
			value = value
				.get(key)
				.ok_or_else(|| not_found(remainder[..=depth].join("/")))?;
		}
		Ok(value.clone())
	}

	/// Move the root up to `target`, nesting the tree one level per step.
	///
	/// Nothing is re-read from disk.
	fn rebase(&mut self, target: &Path) -> Result<()> {
		let Some(mut root) = self.root.take() else {
			return Ok(());
		};

		while root != target {
			let (Some(parent), Some(name)) = (root.parent(), root.file_name()) else {
				let err = ConfigError::DifferentAnchors {
					path: target.to_path_buf(),
					root: root.clone(),
				};
				self.root = Some(root);
				return Err(err);
			};
			let parent = parent.to_path_buf();
			let name = name.to_string_lossy().into_owned();

			debug!(from = %root.display(), to = %parent.display(), "Rebasing config tree");
			self.tree = std::mem::take(&mut self.tree).wrap(name);
			root = parent;
		}

		self.root = Some(root);
		Ok(())
	}

	fn load(&mut self, registry: &LoaderRegistry, path: &Path, force_reload: bool) -> Result<()> {
		let node = self.read(registry, path, force_reload)?;
		let components = self.components(path);
		self.tree.insert(&components, node);
		Ok(())
	}

	/// Decode `path` into a detached node; the tree is only touched once
	/// every file below `path` decoded.
	fn read(&self, registry: &LoaderRegistry, path: &Path, force_reload: bool) -> Result<Node> {
		if !path.is_dir() {
			debug!(path = %path.display(), "Loading file");
			return Ok(Node::Leaf(decode_file(registry, path)?));
		}

		debug!(path = %path.display(), force_reload, "Loading directory");
		let read_error = |source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		};
		let mut children = std::fs::read_dir(path)
			.map_err(read_error)?
			.map(|entry| entry.map(|entry| entry.path()))
			.collect::<std::io::Result<Vec<_>>>()
			.map_err(read_error)?;
		children.sort();

		let mut branch = Node::empty();
		for child in children {
			if !child.is_file() && !child.is_dir() {
				debug!(path = %child.display(), "Skipping special file");
				continue;
			}
			let Some(name) = child.file_name() else {
				continue;
			};
			let node = match self.cached(&child) {
				Some(node) if !force_reload => node.clone(),
				_ => self.read(registry, &child, force_reload)?,
			};
			branch.insert(&[name.to_string_lossy().into_owned()], node);
		}
		Ok(branch)
	}

	/// The node already loaded for `path`.
	fn cached(&self, path: &Path) -> Option<&Node> {
		if !self.is_loaded(path) {
			return None;
		}
		self.tree.lookup(&self.components(path))
	}

	/// Components of `path` below the root.
	fn components(&self, path: &Path) -> Vec<String> {
		let relative = match self.root {
			Some(ref root) => path.strip_prefix(root).unwrap_or(path),
			None => path,
		};
		relative
			.components()
			.filter_map(|component| match component {
				Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
				_ => None,
			})
			.collect()
	}
}
