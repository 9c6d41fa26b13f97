//! modconf - configuration read from directory hierarchies.
//!
//! Directories, files and the structure inside files form one tree that is
//! addressed with plain paths: `conf/app.json/database/host` reads the `host`
//! key of the `database` map decoded from `conf/app.json`. Files are decoded
//! by a registry of loaders, chosen by a `#type:` first line or detected
//! automatically.
//!
//! This library provides:
//! - The loader registry, header option parsing and built-in loaders
//! - The lazily loaded config tree
//! - [`ModularConfig`] and free functions over a shared instance
//! - The `.modconf.toml` settings cascade used by the command-line tool
//!
//! # Example
//!
//! ```no_run
//! use modconf::Value;
//!
//! modconf::set_config_directory("/etc/myapp");
//! let port = modconf::get("server.json/port")?;
//! assert_eq!(port, Value::Int(8080));
//! # Ok::<(), modconf::ConfigError>(())
//! ```

pub mod error;
pub mod exec;
pub mod facade;
pub mod loaders;
pub mod settings;
pub mod tree;
pub mod value;

pub use error::{ConfigError, LoadError, Result};
pub use facade::{
	ConfigDirectoryGuard, DirectoryScope, ModularConfig, default_instance, ensure, get,
	get_config_directory, register_loader, set_config_directory, set_dangerous,
	using_config_directory,
};
pub use loaders::{Decoder, Loader, LoaderRegistry, Options};
pub use value::{Map, Value};
