//! Document loaders backed by serde: JSON, YAML and TOML.

use crate::error::LoadError;
use crate::loaders::options::Options;
use crate::value::{Map, Value};
use serde::Deserialize;

/// Tags from the YAML core schema, accepted by the safe loader.
const CORE_TAGS: [&str; 9] = [
	"str",
	"int",
	"float",
	"bool",
	"null",
	"seq",
	"map",
	"binary",
	"timestamp",
];

pub fn load_json(text: &str, _options: &Options) -> Result<Value, LoadError> {
	serde_json::from_str::<serde_json::Value>(text)
		.map(Value::from)
		.map_err(|e| LoadError::loading_with("can't decode json", e))
}

/// Safe subset of YAML: application tags are rejected.
pub fn load_yaml(text: &str, _options: &Options) -> Result<Value, LoadError> {
	load_yaml_documents(text, false)
}

/// Full YAML: application tags are kept as [`Value::Tagged`].
pub fn load_yaml_full(text: &str, _options: &Options) -> Result<Value, LoadError> {
	load_yaml_documents(text, true)
}

pub fn load_toml(text: &str, _options: &Options) -> Result<Value, LoadError> {
	toml::from_str::<toml::Table>(text)
		.map(|table| Value::from(toml::Value::Table(table)))
		.map_err(|e| LoadError::loading_with("can't decode toml", e))
}

/// No documents decode to an empty map, one to its value, several to a list.
fn load_yaml_documents(text: &str, keep_tags: bool) -> Result<Value, LoadError> {
	if is_empty_yaml_stream(text) {
		return Ok(Value::Map(Map::new()));
	}

	let mut documents = Vec::new();
	for document in serde_yaml::Deserializer::from_str(text) {
		let yaml = serde_yaml::Value::deserialize(document)
			.map_err(|e| LoadError::loading_with("can't parse YAML", e))?;
		documents.push(from_yaml(yaml, keep_tags)?);
	}

	Ok(match documents.len() {
		0 => Value::Map(Map::new()),
		1 => documents.remove(0),
		_ => Value::List(documents),
	})
}

fn is_empty_yaml_stream(text: &str) -> bool {
	text.lines().all(|line| {
		let line = line.trim();
		line.is_empty() || line.starts_with('#')
	})
}

fn from_yaml(yaml: serde_yaml::Value, keep_tags: bool) -> Result<Value, LoadError> {
	Ok(match yaml {
		serde_yaml::Value::Null => Value::Null,
		serde_yaml::Value::Bool(b) => Value::Bool(b),
		serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
			(Some(i), _) => Value::Int(i),
			(None, Some(u)) => Value::from(u),
			(None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
		},
		serde_yaml::Value::String(s) => Value::String(s),
		serde_yaml::Value::Sequence(items) => Value::List(
			items
				.into_iter()
				.map(|item| from_yaml(item, keep_tags))
				.collect::<Result<_, _>>()?,
		),
		serde_yaml::Value::Mapping(mapping) => {
			let mut map = Map::new();
			for (key, value) in mapping {
				map.insert(yaml_key(key)?, from_yaml(value, keep_tags)?);
			}
			Value::Map(map)
		}
		serde_yaml::Value::Tagged(tagged) => {
			let tag = tagged.tag.to_string();
			let inner = from_yaml(tagged.value, keep_tags)?;
			if is_core_tag(&tag) {
				inner
			} else if keep_tags {
				Value::Tagged {
					tag,
					value: Box::new(inner),
				}
			} else {
				return Err(LoadError::loading(format!(
					"can't parse YAML: tag {tag} needs the full loader"
				)));
			}
		}
	})
}

fn is_core_tag(tag: &str) -> bool {
	let name = match tag.strip_prefix("!!") {
		Some(name) => Some(name),
		None => tag
			.trim_start_matches('!')
			.strip_prefix("tag:yaml.org,2002:"),
	};
	name.is_some_and(|name| CORE_TAGS.contains(&name))
}

/// Mapping keys become strings; scalars keep their textual form.
fn yaml_key(key: serde_yaml::Value) -> Result<String, LoadError> {
	match key {
		serde_yaml::Value::String(s) => Ok(s),
		serde_yaml::Value::Number(n) => Ok(n.to_string()),
		serde_yaml::Value::Bool(b) => Ok(b.to_string()),
		serde_yaml::Value::Null => Ok("null".to_string()),
		other => serde_yaml::to_string(&other)
			.map(|s| s.trim().to_string())
			.map_err(|e| LoadError::loading_with("can't parse YAML mapping key", e)),
	}
}
