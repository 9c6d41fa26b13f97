use modconf::loaders::parse_options;
use modconf::{ConfigError, LoadError, Loader, ModularConfig, Options, Value};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, ModularConfig) {
	let dir = TempDir::new().unwrap();
	let root = dir.path().canonicalize().unwrap();
	let mut config = ModularConfig::new();
	config.set_config_directory(&root);
	(dir, root, config)
}

fn write(root: &Path, relative: &str, content: impl AsRef<[u8]>) {
	let path = root.join(relative);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

fn load_error(err: ConfigError) -> LoadError {
	match err {
		ConfigError::Load { source, .. } => source,
		other => panic!("Expected Load error, got {other:?}"),
	}
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_scalar_round_trip_with_headers() {
	let (_dir, root, mut config) = setup();
	write(&root, "int", "#type: int\n-17");
	write(&root, "bool", "#type: boolean\nOff");
	write(&root, "none", "#type: none\n");
	write(&root, "text", "#type: text\n  spaced out\n");
	write(&root, "bytes", "#type: base64\nAP8QIA==");
	write(&root, "float", "#type: float\n3.14159");
	write(&root, "complex", "#type: complex\n(1.5-2j)");

	assert_eq!(config.get("int").unwrap(), Value::Int(-17));
	assert_eq!(config.get("bool").unwrap(), Value::Bool(false));
	assert_eq!(config.get("none").unwrap(), Value::Null);
	assert_eq!(config.get("text").unwrap(), Value::from("  spaced out\n"));
	assert_eq!(
		config.get("bytes").unwrap(),
		Value::Bytes(vec![0x00, 0xff, 0x10, 0x20])
	);

	let float = config.get("float").unwrap().as_f64().unwrap();
	assert!((float - 3.14159).abs() < f64::EPSILON);

	match config.get("complex").unwrap() {
		Value::Complex { re, im } => {
			assert!((re - 1.5).abs() < f64::EPSILON);
			assert!((im + 2.0).abs() < f64::EPSILON);
		}
		other => panic!("Expected complex, got {other:?}"),
	}
}

#[test]
fn test_integers_stay_exact_past_i64() {
	let (_dir, root, mut config) = setup();
	write(&root, "max", "#type: int\n18446744073709551615");
	write(&root, "plain", "12345678901234567891\n");

	assert_eq!(
		config.get("max").unwrap().as_bigint().map(|i| i.to_string()).as_deref(),
		Some("18446744073709551615")
	);
	assert!(matches!(config.get("plain").unwrap(), Value::BigInt(_)));
	assert_eq!(
		config.get("plain").unwrap().as_bigint().map(|i| i.to_string()).as_deref(),
		Some("12345678901234567891")
	);
}

#[test]
fn test_failed_reload_keeps_directory_readable() {
	let (_dir, root, mut config) = setup();
	write(&root, "d/a.json", r#"{"k": 1}"#);
	write(&root, "d/b.json", r#"{"k": 2}"#);
	write(&root, "d/c.json", r#"{"k": 3}"#);
	config.ensure("d", false).unwrap();

	write(&root, "d/b.json", "#type: json\n{");
	assert!(matches!(
		config.ensure("d", true).unwrap_err(),
		ConfigError::Load { .. }
	));
	assert_eq!(config.get("d/c.json/k").unwrap(), Value::Int(3));
	assert_eq!(config.get("d/b.json/k").unwrap(), Value::Int(2));
}

#[test]
fn test_header_precedence() {
	let (_dir, root, mut config) = setup();
	write(&root, "raw.json", "#type: text\n{\"a\": 1}");
	assert_eq!(config.get("raw.json").unwrap(), Value::from("{\"a\": 1}"));
}

#[test]
fn test_unknown_header_regardless_of_body() {
	let (_dir, root, mut config) = setup();
	write(&root, "a", "#type: bogus\n{\"valid\": \"json\"}");
	write(&root, "b", b"#type: bogus\n\xff\xfe\x00".as_slice());

	for name in ["a", "b"] {
		match load_error(config.get(name).unwrap_err()) {
			LoadError::Missing { name } => assert_eq!(name, "bogus"),
			other => panic!("Expected Missing error, got {other:?}"),
		}
	}
}

#[test]
fn test_option_escape_law() {
	let options = parse_options("loader", "a=val\\;ue;b=2").unwrap();
	let expected: Options = [("a", "val;ue"), ("b", "2")]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	assert_eq!(options, expected);
}

#[test]
fn test_ini_with_header_options() {
	let (_dir, root, mut config) = setup();
	write(
		&root,
		"app.ini",
		"#type: winconfig : interpolation=extended ; allow_no_value\n\
		 [paths]\nbase = /srv\ndata = ${base}/data\nverbose\n",
	);

	assert_eq!(
		config.get("app.ini/paths/data").unwrap(),
		Value::from("/srv/data")
	);
	assert_eq!(config.get("app.ini/paths/verbose").unwrap(), Value::Null);
}

// ============================================================================
// Tree behavior
// ============================================================================

#[test]
fn test_idempotent_caching() {
	let (_dir, root, mut config) = setup();
	write(&root, "value.json", r#"{"v": 1}"#);

	config.ensure("value.json", false).unwrap();
	write(&root, "value.json", r#"{"v": 2}"#);
	config.ensure("value.json", false).unwrap();
	assert_eq!(config.get("value.json/v").unwrap(), Value::Int(1));

	config.ensure("value.json", true).unwrap();
	assert_eq!(config.get("value.json/v").unwrap(), Value::Int(2));
}

#[test]
fn test_directory_aggregation() {
	let (_dir, root, mut config) = setup();
	write(&root, "dir/a.txt", "Hello World");
	write(&root, "dir/b.json", r#"{"x":1}"#);
	write(&root, "dir/c/d.json", r#"{"y":2}"#);

	let expected: Value = [
		("a.txt", Value::from("Hello World")),
		("b.json", [("x", 1i64)].into_iter().collect()),
		(
			"c",
			[("d.json", [("y", 2i64)].into_iter().collect::<Value>())]
				.into_iter()
				.collect(),
		),
	]
	.into_iter()
	.collect();

	assert_eq!(config.get("dir").unwrap(), expected);
}

#[test]
fn test_attribute_descent() {
	let (_dir, root, mut config) = setup();
	write(&root, "path/to/file", r#"{"Nested":{"bar":"v"}}"#);

	assert_eq!(config.get("path/to/file/Nested/bar").unwrap(), Value::from("v"));
	match config.get("path/to/file/Nested/missing").unwrap_err() {
		ConfigError::ConfigNotFound { attribute, file } => {
			assert_eq!(attribute, "Nested/missing");
			assert_eq!(file, root.join("path/to/file"));
		}
		other => panic!("Expected ConfigNotFound error, got {other:?}"),
	}
}

#[test]
fn test_rebase_correctness() {
	let (_dir, root, mut config) = setup();
	write(&root, "a/b/x.json", r#"{"v": "x"}"#);
	write(&root, "a/c/y.json", r#"{"v": "y"}"#);

	assert_eq!(config.get("a/b/x.json/v").unwrap(), Value::from("x"));
	assert_eq!(config.get("a/c/y.json/v").unwrap(), Value::from("y"));
	assert_eq!(config.tree().common_root(), Some(root.join("a").as_path()));

	assert_eq!(config.get("a/b/x.json/v").unwrap(), Value::from("x"));
	assert_eq!(config.get("a/c/y.json/v").unwrap(), Value::from("y"));
}

#[test]
fn test_parent_directory_paths() {
	let (_dir, root, mut config) = setup();
	write(&root, "one/value", "1");
	fs::create_dir_all(root.join("two")).unwrap();

	config.set_config_directory("two");
	assert_eq!(config.get("../one/value").unwrap(), Value::Int(1));
}

// ============================================================================
// Dangerous loaders
// ============================================================================

#[test]
fn test_python_gating() {
	let (_dir, root, mut config) = setup();
	write(&root, "settings.py", "#type: python\nanswer = 6 * 7\n");

	match load_error(config.get("settings.py/answer").unwrap_err()) {
		LoadError::Disabled { name } => assert_eq!(name, "python"),
		other => panic!("Expected Disabled error, got {other:?}"),
	}

	if modconf::exec::find_interpreter("MODCONF_PYTHON", &["python3", "python"]).is_none() {
		eprintln!("skipping enabled half: no python interpreter on PATH");
		return;
	}
	config.set_dangerous("python", true).unwrap();
	assert_eq!(config.get("settings.py/answer").unwrap(), Value::Int(42));
}

#[test]
fn test_yaml_gating() {
	let (_dir, root, mut config) = setup();
	write(
		&root,
		"object.yaml",
		"#type: yaml\n!!python/object:__main__.Thing {size: 3}\n",
	);

	assert!(matches!(
		load_error(config.get("object.yaml").unwrap_err()),
		LoadError::Loading { .. }
	));

	config.set_dangerous("yaml", true).unwrap();
	match config.get("object.yaml").unwrap() {
		Value::Tagged { tag, value } => {
			assert!(tag.contains("python/object"), "unexpected tag {tag}");
			assert_eq!(value.get("size"), Some(&Value::Int(3)));
		}
		other => panic!("Expected tagged value, got {other:?}"),
	}
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_custom_loader_with_aliases() {
	let (_dir, root, mut config) = setup();
	config
		.register_loader(Loader::new("csv").alias("commas").safe(
			|text: &str, options: &Options| -> Result<Value, LoadError> {
				let separator = options.get("sep").map(String::as_str).unwrap_or(",");
				Ok(Value::List(
					text.trim().split(separator).map(Value::from).collect(),
				))
			},
		))
		.unwrap();
	write(&root, "list", "#type: commas : sep=|\na|b|c");

	assert_eq!(
		config.get("list").unwrap(),
		Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")])
	);
}

#[test]
fn test_register_without_decoder_fails() {
	let mut config = ModularConfig::new();
	assert!(matches!(
		config.register_loader(Loader::new("empty")).unwrap_err(),
		ConfigError::NoDecodeFunction { .. }
	));
}

// ============================================================================
// Shared instance
// ============================================================================

#[test]
#[serial]
fn test_free_functions_use_shared_instance() {
	let dir = TempDir::new().unwrap();
	let root = dir.path().canonicalize().unwrap();
	write(&root, "shared/name", "#type: text\nshared");

	let previous = modconf::get_config_directory();
	modconf::set_config_directory(&root);
	assert_eq!(modconf::get("shared/name").unwrap(), Value::from("shared"));

	{
		let _guard = modconf::using_config_directory("shared");
		assert_eq!(modconf::get_config_directory(), root.join("shared"));
		modconf::ensure("name", true).unwrap();
		assert_eq!(modconf::get("name").unwrap(), Value::from("shared"));
	}
	assert_eq!(modconf::get_config_directory(), root);

	modconf::set_config_directory(previous);
}
