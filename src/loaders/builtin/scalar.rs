//! Scalar loaders: numbers, booleans, null and plain text.

use crate::error::{Attempt, LoadError};
use crate::loaders::options::Options;
use crate::value::Value;
use num_bigint::BigInt;
use regex::Regex;
use std::sync::LazyLock;

const UNSIGNED: &str = r"(?:(?:\d+\.?\d*|\.\d+)(?:e[+-]?\d+)?|inf(?:inity)?|nan)";

/// Python-style complex literal: `1+2j`, `-3.5j`, `j`, `(1e3-2j)`, `4`.
static COMPLEX: LazyLock<Regex> = LazyLock::new(|| {
	let pattern = format!(
		r"(?i)^(?:(?P<a_re>[+-]?{u})(?P<a_im>[+-]{u}?)j|(?P<b_im>[+-]?{u}?)j|(?P<c_re>[+-]?{u}))$",
		u = UNSIGNED
	);
	Regex::new(&pattern).expect("complex literal pattern is valid")
});

/// Integers of any size; values past `i64` become [`Value::BigInt`].
pub fn load_int(text: &str, _options: &Options) -> Result<Value, LoadError> {
	let text = text.trim();
	if let Ok(small) = text.parse::<i64>() {
		return Ok(Value::Int(small));
	}
	text.parse::<BigInt>()
		.map(Value::from)
		.map_err(|e| LoadError::loading_with("can't convert to an integer", e))
}

pub fn load_float(text: &str, _options: &Options) -> Result<Value, LoadError> {
	text.trim()
		.parse::<f64>()
		.map(Value::Float)
		.map_err(|e| LoadError::loading_with("can't convert to a float", e))
}

pub fn load_complex(text: &str, _options: &Options) -> Result<Value, LoadError> {
	let (re, im) = parse_complex(text)
		.ok_or_else(|| LoadError::loading(format!("can't convert {:?} to a complex", text.trim())))?;
	Ok(Value::Complex { re, im })
}

/// Tries int, then float, then complex.
pub fn load_number(text: &str, options: &Options) -> Result<Value, LoadError> {
	let mut attempts = Vec::with_capacity(3);
	let parsers: [(&str, fn(&str, &Options) -> Result<Value, LoadError>); 3] = [
		("int", load_int),
		("float", load_float),
		("complex", load_complex),
	];
	for (loader, parse) in parsers {
		match parse(text, options) {
			Ok(value) => return Ok(value),
			Err(error) => attempts.push(Attempt {
				loader: loader.to_string(),
				error,
			}),
		}
	}
	Err(LoadError::Aggregate {
		message: "can't convert to a number".to_string(),
		attempts,
	})
}

pub fn load_bool(text: &str, _options: &Options) -> Result<Value, LoadError> {
	parse_bool(text)
		.map(Value::Bool)
		.ok_or_else(|| LoadError::loading("can't determine boolean value"))
}

pub fn load_none(text: &str, _options: &Options) -> Result<Value, LoadError> {
	match text.trim().to_lowercase().as_str() {
		"" | "none" | "null" => Ok(Value::Null),
		_ => Err(LoadError::loading("text is not empty, 'none' or 'null'")),
	}
}

pub fn load_text(text: &str, _options: &Options) -> Result<Value, LoadError> {
	Ok(Value::String(text.to_string()))
}

/// Case-insensitive `true/yes/on` and `false/no/off`.
pub fn parse_bool(text: &str) -> Option<bool> {
	match text.trim().to_lowercase().as_str() {
		"true" | "yes" | "on" => Some(true),
		"false" | "no" | "off" => Some(false),
		_ => None,
	}
}

fn parse_complex(text: &str) -> Option<(f64, f64)> {
	let mut literal = text.trim();
	if let Some(inner) = literal.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
		literal = inner.trim();
	}
	let captures = COMPLEX.captures(literal)?;

	if let (Some(re), Some(im)) = (captures.name("a_re"), captures.name("a_im")) {
		return Some((re.as_str().parse().ok()?, parse_imaginary(im.as_str())?));
	}
	if let Some(im) = captures.name("b_im") {
		return Some((0.0, parse_imaginary(im.as_str())?));
	}
	let re = captures.name("c_re")?;
	Some((re.as_str().parse().ok()?, 0.0))
}

/// The coefficient in front of `j`; a bare sign means one.
fn parse_imaginary(coefficient: &str) -> Option<f64> {
	match coefficient {
		"" | "+" => Some(1.0),
		"-" => Some(-1.0),
		other => other.parse().ok(),
	}
}
