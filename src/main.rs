use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use modconf::ModularConfig;
use modconf::loaders::parse_header;
use modconf::settings::{discover_settings, load_merged_settings, user_settings_path};

#[derive(Parser)]
#[command(name = "modconf")]
#[command(
	author,
	version,
	about = "Read configuration values from directory hierarchies"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	/// Log loading decisions to stderr
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the value at a config path as JSON
	Get {
		/// Path to a directory, a file, or keys inside a file
		path: PathBuf,

		/// Resolve relative paths against this directory
		#[arg(long, value_name = "DIR")]
		dir: Option<PathBuf>,

		/// Switch on the dangerous variant of a loader (repeatable)
		#[arg(long = "enable-dangerous", value_name = "LOADER")]
		enable_dangerous: Vec<String>,

		/// Ignore .modconf.toml settings files
		#[arg(long)]
		no_settings: bool,

		/// Print JSON on a single line
		#[arg(long)]
		compact: bool,
	},
	/// Parse a `#type:` header and print its type and options
	Header {
		/// Header text, with or without the leading `#type:`
		header: String,
	},
	/// List registered loaders
	Loaders,
	/// Settings file management commands
	Settings {
		#[command(subcommand)]
		action: SettingsAction,
	},
}

#[derive(Subcommand)]
enum SettingsAction {
	/// Display settings files in cascade order and the merged result
	Show,
	/// Check all settings files for errors without reading any config
	Validate,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli.command) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: bool) {
	let default_filter = if verbose { "modconf=debug" } else { "modconf=warn" };
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn run(command: Commands) -> Result<ExitCode> {
	match command {
		Commands::Get {
			path,
			dir,
			enable_dangerous,
			no_settings,
			compact,
		} => handle_get(path, dir, &enable_dangerous, no_settings, compact),
		Commands::Header { header } => handle_header(&header),
		Commands::Loaders => handle_loaders(),
		Commands::Settings { action } => match action {
			SettingsAction::Show => handle_settings_show(),
			SettingsAction::Validate => handle_settings_validate(),
		},
	}
}

fn handle_get(
	path: PathBuf,
	dir: Option<PathBuf>,
	enable_dangerous: &[String],
	no_settings: bool,
	compact: bool,
) -> Result<ExitCode> {
	let mut config = ModularConfig::new();

	if !no_settings {
		let cwd = std::env::current_dir().context("Failed to get current directory")?;
		let settings = load_merged_settings(&cwd).context("Failed to load settings")?;
		settings.apply(&mut config);
	}

	if let Some(dir) = dir {
		config.set_config_directory(dir);
	}

	for name in enable_dangerous {
		config
			.set_dangerous(name, true)
			.with_context(|| format!("Can't enable dangerous loader {name}"))?;
	}

	let value = config
		.get(&path)
		.with_context(|| format!("Failed to get {}", path.display()))?;

	let json = if compact {
		serde_json::to_string(&value)
	} else {
		serde_json::to_string_pretty(&value)
	}
	.context("Failed to serialize value")?;
	println!("{json}");

	Ok(ExitCode::SUCCESS)
}

fn handle_header(header: &str) -> Result<ExitCode> {
	let header = header.strip_prefix("#type:").unwrap_or(header);
	let parsed = parse_header(header).context("Invalid header")?;

	let json = serde_json::json!({
		"type": parsed.type_name,
		"options": parsed.options,
	});
	println!("{}", serde_json::to_string_pretty(&json)?);
	Ok(ExitCode::SUCCESS)
}

fn handle_loaders() -> Result<ExitCode> {
	let config = ModularConfig::new();

	for entry in config.registry().loaders() {
		let mut line = format!("{:<8}", entry.name());
		if !entry.aliases().is_empty() {
			line.push_str(&format!("  aliases: {}", entry.aliases().join(", ")));
		}
		if entry.has_dangerous() {
			let state = if entry.dangerous_enabled() { "on" } else { "off" };
			line.push_str(&format!("  dangerous: {state}"));
		}
		if !entry.has_safe() {
			line.push_str("  (no safe variant)");
		}
		println!("{}", line.trim_end());
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_settings_show() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let found = discover_settings(&cwd).context("Failed to discover settings files")?;

	if found.is_empty() {
		println!("No settings files found.");
	} else {
		println!("Settings files (in cascade order):\n");
		for loaded in &found {
			println!("# Source: {}", loaded.path.display());
			println!("# root: {}", loaded.settings.root);
			if let Some(ref env_var) = loaded.settings.user_settings_disable_env_var {
				println!("# user-settings-disable-env-var: {}", env_var);
			}
			if let Some(directory) = loaded.config_directory() {
				println!("# config-directory: {}", directory.display());
			}
			if !loaded.settings.enable_dangerous.is_empty() {
				println!(
					"# enable-dangerous: {}",
					loaded.settings.enable_dangerous.join(", ")
				);
			}
			println!();
		}

		let merged = modconf::settings::merge_settings(&found);
		println!("Effective settings:");
		match merged.config_directory {
			Some(ref directory) => println!(
				"  config-directory: {} (from {})",
				directory.value.display(),
				directory.source.display()
			),
			None => println!("  config-directory: (working directory)"),
		}
		for name in &merged.enable_dangerous {
			println!(
				"  enable-dangerous: {} (from {})",
				name.value,
				name.source.display()
			);
		}
		println!();
	}

	if let Ok(user_path) = user_settings_path() {
		println!("User settings path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_settings_validate() -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;

	match discover_settings(&cwd) {
		Ok(found) => {
			if found.is_empty() {
				println!("No settings files found.");
			} else {
				println!("All settings files are valid:");
				for loaded in &found {
					println!("  {}", loaded.path.display());
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Settings error: {:?}", anyhow::Error::from(e));
			Ok(ExitCode::FAILURE)
		}
	}
}
