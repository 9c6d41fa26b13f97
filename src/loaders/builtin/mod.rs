//! Loaders available in every new registry.

pub mod binary;
pub mod ini;
pub mod python;
pub mod scalar;
pub mod structured;

use crate::loaders::registry::Loader;

/// The built-in loaders, in registration order.
pub fn builtin_loaders() -> Vec<Loader> {
	vec![
		Loader::new("int").alias("integer").safe(scalar::load_int),
		Loader::new("float").alias("real").safe(scalar::load_float),
		Loader::new("complex").safe(scalar::load_complex),
		Loader::new("number").alias("num").safe(scalar::load_number),
		Loader::new("bool").alias("boolean").safe(scalar::load_bool),
		Loader::new("none").alias("null").safe(scalar::load_none),
		Loader::new("json").safe(structured::load_json),
		Loader::new("yaml")
			.safe(structured::load_yaml)
			.dangerous(structured::load_yaml_full),
		Loader::new("toml").safe(structured::load_toml),
		Loader::new("ini")
			.alias("inifile")
			.alias("winconfig")
			.safe(ini::load_ini),
		Loader::new("base64").alias("b64").safe(binary::load_base64),
		Loader::new("python").dangerous(python::PythonLoader::new()),
		Loader::new("text").safe(scalar::load_text),
	]
}
