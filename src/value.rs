//! Decoded configuration values.
//!
//! Every loader produces a [`Value`]. Maps are ordered by key so that
//! directory listings and decoded documents print deterministically.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Map type used for decoded mappings and directory listings.
pub type Map = BTreeMap<String, Value>;

/// A decoded configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	/// An integer outside the `i64` range. Smaller integers are always
	/// [`Value::Int`]; build values through `From<BigInt>` to keep that.
	BigInt(BigInt),
	Float(f64),
	Complex { re: f64, im: f64 },
	String(String),
	Bytes(Vec<u8>),
	List(Vec<Value>),
	Map(Map),
	/// A value carrying an application tag, only produced by the dangerous
	/// YAML loader.
	Tagged { tag: String, value: Box<Value> },
}

impl Value {
	/// Look up a key in a map value.
	pub fn get(&self, key: &str) -> Option<&Value> {
		match self {
			Value::Map(map) => map.get(key),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Any integer, whatever its size.
	pub fn as_bigint(&self) -> Option<BigInt> {
		match self {
			Value::Int(i) => Some(BigInt::from(*i)),
			Value::BigInt(i) => Some(i.clone()),
			_ => None,
		}
	}

	/// Integers widen to floats.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(i) => Some(*i as f64),
			Value::BigInt(i) => i.to_f64(),
			Value::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Value::Bytes(b) => Some(b),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&Map> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Short name of the variant, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) | Value::BigInt(_) => "int",
			Value::Float(_) => "float",
			Value::Complex { .. } => "complex",
			Value::String(_) => "string",
			Value::Bytes(_) => "bytes",
			Value::List(_) => "list",
			Value::Map(_) => "map",
			Value::Tagged { .. } => "tagged",
		}
	}
}

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Value::Null => serializer.serialize_unit(),
			Value::Bool(b) => serializer.serialize_bool(*b),
			Value::Int(i) => serializer.serialize_i64(*i),
			Value::BigInt(i) => match (i.to_i128(), i.to_u128()) {
				(Some(small), _) => serializer.serialize_i128(small),
				(None, Some(large)) => serializer.serialize_u128(large),
				(None, None) => serializer.serialize_str(&i.to_string()),
			},
			Value::Float(f) => serializer.serialize_f64(*f),
			Value::Complex { re, im } => {
				let mut map = serializer.serialize_map(Some(2))?;
				map.serialize_entry("real", re)?;
				map.serialize_entry("imag", im)?;
				map.end()
			}
			Value::String(s) => serializer.serialize_str(s),
			Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
			Value::List(items) => serializer.collect_seq(items),
			Value::Map(map) => serializer.collect_map(map),
			Value::Tagged { tag, value } => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry(tag, value)?;
				map.end()
			}
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<u64> for Value {
	fn from(u: u64) -> Self {
		match i64::try_from(u) {
			Ok(i) => Value::Int(i),
			Err(_) => Value::BigInt(BigInt::from(u)),
		}
	}
}

impl From<BigInt> for Value {
	fn from(i: BigInt) -> Self {
		match i.to_i64() {
			Some(small) => Value::Int(small),
			None => Value::BigInt(i),
		}
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<Vec<u8>> for Value {
	fn from(bytes: Vec<u8>) -> Self {
		Value::Bytes(bytes)
	}
}

impl From<Map> for Value {
	fn from(map: Map) -> Self {
		Value::Map(map)
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Value::Map(
			iter.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
				(Some(i), _) => Value::Int(i),
				(None, Some(u)) => Value::from(u),
				(None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => {
				Value::List(items.into_iter().map(Value::from).collect())
			}
			serde_json::Value::Object(map) => Value::Map(
				map.into_iter()
					.map(|(k, v)| (k, Value::from(v)))
					.collect(),
			),
		}
	}
}

impl From<toml::Value> for Value {
	fn from(toml: toml::Value) -> Self {
		match toml {
			toml::Value::String(s) => Value::String(s),
			toml::Value::Integer(i) => Value::Int(i),
			toml::Value::Float(f) => Value::Float(f),
			toml::Value::Boolean(b) => Value::Bool(b),
			toml::Value::Datetime(dt) => Value::String(dt.to_string()),
			toml::Value::Array(items) => {
				Value::List(items.into_iter().map(Value::from).collect())
			}
			toml::Value::Table(table) => Value::Map(
				table
					.into_iter()
					.map(|(k, v)| (k, Value::from(v)))
					.collect(),
			),
		}
	}
}
