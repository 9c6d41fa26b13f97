//! Path resolution between logical config paths and the filesystem.

use crate::error::{ConfigError, Result};
use std::path::{Component, Path, PathBuf};

/// Remove `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				// `..` at the root stays at the root
				if !normalized.pop() && !normalized.has_root() {
					normalized.push(component);
				}
			}
			other => normalized.push(other),
		}
	}
	normalized
}

/// Absolute, normalized form of `path` relative to `base`.
///
/// The longest existing prefix is canonicalized so that symlinked
/// directories resolve to a single spelling; the rest is kept as written.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
	let joined = normalize(&base.join(path));
	for ancestor in joined.ancestors() {
		if let Ok(canonical) = ancestor.canonicalize() {
			return match joined.strip_prefix(ancestor) {
				Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
				_ => canonical,
			};
		}
	}
	joined
}

/// Split `path` into the real filesystem entry and the logical remainder.
///
/// An existing directory is its own real path. Otherwise the nearest
/// existing ancestor must be a file; the components below it are the keys
/// to look up inside the decoded content.
pub fn split_real_path(path: &Path) -> Result<(PathBuf, Vec<String>)> {
	if path.is_dir() {
		return Ok((path.to_path_buf(), Vec::new()));
	}

	let not_found = || ConfigError::ConfigFileNotFound {
		path: path.to_path_buf(),
	};

	let mut remainder = Vec::new();
	let mut current = path;
	loop {
		if current.is_file() {
			remainder.reverse();
			return Ok((current.to_path_buf(), remainder));
		}
		if current.exists() {
			return Err(not_found());
		}
		let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
			return Err(not_found());
		};
		remainder.push(name.to_string_lossy().into_owned());
		current = parent;
	}
}

/// Prefix and root directory of a path, e.g. `C:\` or `/`.
fn anchor(path: &Path) -> PathBuf {
	path.components()
		.take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
		.collect()
}

/// Longest common ancestor of two absolute paths.
pub fn common_ancestor(root: &Path, path: &Path) -> Result<PathBuf> {
	if anchor(root) != anchor(path) || anchor(root).as_os_str().is_empty() {
		return Err(ConfigError::DifferentAnchors {
			path: path.to_path_buf(),
			root: root.to_path_buf(),
		});
	}
	Ok(root
		.components()
		.zip(path.components())
		.take_while(|(a, b)| a == b)
		.map(|(a, _)| a)
		.collect())
}
