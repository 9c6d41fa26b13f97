//! External interpreter execution.
//!
//! This module handles:
//! - Locating an interpreter from an environment override or PATH
//! - Running it with a payload on stdin and capturing its output

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Run a binary, feed `input` to its stdin and collect stdout and stderr.
///
/// stdin is written from a separate thread so a child that produces output
/// before draining its input can't deadlock us.
pub fn run_with_input(binary: &Path, args: &[&str], input: &[u8]) -> std::io::Result<Output> {
	let mut child = Command::new(binary)
		.args(args)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()?;

	let mut stdin = child
		.stdin
		.take()
		.ok_or_else(|| std::io::Error::other("child stdin was not captured"))?;

	std::thread::scope(|scope| {
		let writer = scope.spawn(move || {
			// A child exiting early closes the pipe; its exit status reports why
			let result = stdin.write_all(input);
			drop(stdin);
			match result {
				Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
				other => other,
			}
		});
		let output = child.wait_with_output()?;
		writer
			.join()
			.map_err(|_| std::io::Error::other("stdin writer panicked"))??;
		Ok(output)
	})
}

/// Locate an interpreter.
///
/// A non-empty `env_var` names the command to use; otherwise the first of
/// `candidates` found on PATH wins.
pub fn find_interpreter(env_var: &str, candidates: &[&str]) -> Option<PathBuf> {
	if let Ok(command) = std::env::var(env_var)
		&& !command.trim().is_empty()
	{
		return resolve_command(command.trim());
	}
	candidates.iter().find_map(|candidate| resolve_command(candidate))
}

/// Resolve a command name to its full path.
///
/// If the command is already an absolute path, returns it as-is.
/// Otherwise, searches PATH for the command.
pub fn resolve_command(command: &str) -> Option<PathBuf> {
	let path = Path::new(command);

	if path.is_absolute() {
		return path.is_file().then(|| path.to_path_buf());
	}

	let path_var = std::env::var_os("PATH")?;
	std::env::split_paths(&path_var)
		.map(|dir| dir.join(command))
		.find(|full_path| full_path.is_file())
}
