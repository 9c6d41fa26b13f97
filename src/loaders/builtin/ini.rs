//! Windows-style INI files.
//!
//! The result is a two-level map `section -> key -> string`. Keys are
//! lowercased, values of the default section are visible in every other
//! section, and values are interpolated unless `interpolation=none`.
//!
//! Supported header options:
//! - `allow_no_value`, `strict`, `empty_lines_in_values`: booleans, a bare
//!   name acts as a flag
//! - `delimiters`, `comment_prefixes`, `inline_comment_prefixes`: JSON lists
//!   of strings
//! - `default_section`: name of the section holding defaults
//! - `interpolation`: `none`, `basic` (`%(key)s`) or `extended` (`${section:key}`)

use crate::error::LoadError;
use crate::loaders::builtin::scalar::parse_bool;
use crate::loaders::options::Options;
use crate::value::{Map, Value};
use std::collections::{BTreeMap, HashSet};

const MAX_INTERPOLATION_DEPTH: usize = 10;

type RawSection = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
	None,
	Basic,
	Extended,
}

#[derive(Debug, Clone)]
struct IniOptions {
	allow_no_value: bool,
	delimiters: Vec<String>,
	comment_prefixes: Vec<String>,
	inline_comment_prefixes: Vec<String>,
	strict: bool,
	empty_lines_in_values: bool,
	default_section: String,
	interpolation: Interpolation,
}

impl Default for IniOptions {
	fn default() -> Self {
		IniOptions {
			allow_no_value: false,
			delimiters: vec!["=".to_string(), ":".to_string()],
			comment_prefixes: vec!["#".to_string(), ";".to_string()],
			inline_comment_prefixes: Vec::new(),
			strict: true,
			empty_lines_in_values: true,
			default_section: "DEFAULT".to_string(),
			interpolation: Interpolation::Basic,
		}
	}
}

impl IniOptions {
	fn from_options(options: &Options) -> Result<Self, LoadError> {
		let mut ini = IniOptions::default();

		for (name, target) in [
			("allow_no_value", &mut ini.allow_no_value),
			("strict", &mut ini.strict),
			("empty_lines_in_values", &mut ini.empty_lines_in_values),
		] {
			if let Some(value) = options.get(name) {
				*target = flag(name, value)?;
			}
		}

		for (name, target) in [
			("delimiters", &mut ini.delimiters),
			("comment_prefixes", &mut ini.comment_prefixes),
			("inline_comment_prefixes", &mut ini.inline_comment_prefixes),
		] {
			if let Some(value) = options.get(name) {
				*target = string_list(name, value)?;
			}
		}

		if let Some(section) = options.get("default_section") {
			ini.default_section = section.clone();
		}

		if let Some(interpolation) = options.get("interpolation") {
			ini.interpolation = match interpolation.trim().to_lowercase().as_str() {
				"none" => Interpolation::None,
				"basic" => Interpolation::Basic,
				"extended" => Interpolation::Extended,
				other => {
					return Err(LoadError::option_parse(
						"ini",
						format!("unrecognized interpolation setting {other}"),
					));
				}
			};
		}

		Ok(ini)
	}
}

fn flag(name: &str, value: &str) -> Result<bool, LoadError> {
	if value.is_empty() {
		return Ok(true);
	}
	parse_bool(value)
		.ok_or_else(|| LoadError::option_parse("ini", format!("{name} must be a boolean")))
}

fn string_list(name: &str, value: &str) -> Result<Vec<String>, LoadError> {
	serde_json::from_str::<Vec<String>>(value)
		.map_err(|_| LoadError::option_parse("ini", format!("can't parse {name} as a list of strings")))
}

fn ini_error(line: usize, reason: impl std::fmt::Display) -> LoadError {
	LoadError::loading(format!("can't load ini file: line {line}: {reason}"))
}

pub fn load_ini(text: &str, options: &Options) -> Result<Value, LoadError> {
	let options = IniOptions::from_options(options)?;
	let mut sections = parse(text, &options)?;
	let defaults = sections.remove(&options.default_section).unwrap_or_default();

	let lookup = Lookup {
		defaults: &defaults,
		sections: &sections,
		interpolation: options.interpolation,
	};

	let mut result = Map::new();
	result.insert(
		options.default_section.clone(),
		lookup.render(None, &defaults)?,
	);
	for (name, own) in &sections {
		let mut merged = defaults.clone();
		merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
		result.insert(name.clone(), lookup.render(Some(name), &merged)?);
	}

	Ok(Value::Map(result))
}

/// Read sections with their raw (not yet interpolated) values.
fn parse(text: &str, options: &IniOptions) -> Result<BTreeMap<String, RawSection>, LoadError> {
	let mut sections: BTreeMap<String, BTreeMap<String, Option<Vec<String>>>> = BTreeMap::new();
	let mut added: HashSet<(String, String)> = HashSet::new();
	let mut current: Option<String> = None;
	// Option being continued and the indentation of its first line
	let mut cursor: Option<(String, usize)> = None;

	for (index, line) in text.lines().enumerate() {
		let lineno = index + 1;
		let comment_start = comment_start(line, options);
		let value = match comment_start {
			Some(start) => &line[..start],
			None => line,
		}
		.trim();

		if value.is_empty() {
			if !options.empty_lines_in_values {
				cursor = None;
			} else if comment_start.is_none()
				&& let (Some(section), Some((key, _))) = (&current, &cursor)
				&& let Some(Some(lines)) = sections.get_mut(section).and_then(|s| s.get_mut(key))
			{
				lines.push(String::new());
			}
			continue;
		}

		let indent = line.len() - line.trim_start().len();
		if let (Some(section), Some((key, key_indent))) = (&current, &cursor)
			&& indent > *key_indent
		{
			if let Some(Some(lines)) = sections.get_mut(section).and_then(|s| s.get_mut(key)) {
				lines.push(value.to_string());
			}
			continue;
		}

		if let Some(name) = section_header(value) {
			if options.strict
				&& name != options.default_section
				&& sections.contains_key(name)
			{
				return Err(ini_error(lineno, format!("section {name:?} already exists")));
			}
			sections.entry(name.to_string()).or_default();
			current = Some(name.to_string());
			cursor = None;
			continue;
		}

		let Some(section) = current.clone() else {
			return Err(ini_error(lineno, "file contains no section headers"));
		};

		let (key, raw) = match find_delimiter(value, &options.delimiters) {
			Some((start, len)) => (value[..start].trim(), Some(value[start + len..].trim())),
			None if options.allow_no_value => (value, None),
			None => return Err(ini_error(lineno, format!("can't parse {value:?}"))),
		};
		let key = key.to_lowercase();
		if key.is_empty() {
			return Err(ini_error(lineno, "missing option name"));
		}
		if !added.insert((section.clone(), key.clone())) && options.strict {
			return Err(ini_error(
				lineno,
				format!("option {key:?} in section {section:?} already exists"),
			));
		}

		sections
			.entry(section)
			.or_default()
			.insert(key.clone(), raw.map(|raw| vec![raw.to_string()]));
		cursor = Some((key, indent));
	}

	Ok(sections
		.into_iter()
		.map(|(name, values)| {
			let values = values
				.into_iter()
				.map(|(key, lines)| (key, lines.map(|lines| lines.join("\n").trim_end().to_string())))
				.collect();
			(name, values)
		})
		.collect())
}

/// Byte offset where a comment starts on this line, if any.
fn comment_start(line: &str, options: &IniOptions) -> Option<usize> {
	let trimmed = line.trim_start();
	if options
		.comment_prefixes
		.iter()
		.any(|prefix| !prefix.is_empty() && trimmed.starts_with(prefix.as_str()))
	{
		return Some(0);
	}

	options
		.inline_comment_prefixes
		.iter()
		.filter(|prefix| !prefix.is_empty())
		.flat_map(|prefix| line.match_indices(prefix.as_str()).map(|(start, _)| start))
		.filter(|&start| start == 0 || line[..start].ends_with(char::is_whitespace))
		.min()
}

fn section_header(value: &str) -> Option<&str> {
	let rest = value.strip_prefix('[')?;
	let end = rest.rfind(']')?;
	(end > 0).then(|| &rest[..end])
}

/// Earliest delimiter in the line; ties go to the first listed delimiter.
fn find_delimiter(value: &str, delimiters: &[String]) -> Option<(usize, usize)> {
	value.char_indices().find_map(|(start, _)| {
		delimiters
			.iter()
			.find(|d| !d.is_empty() && value[start..].starts_with(d.as_str()))
			.map(|d| (start, d.len()))
	})
}

struct Lookup<'a> {
	defaults: &'a RawSection,
	sections: &'a BTreeMap<String, RawSection>,
	interpolation: Interpolation,
}

impl Lookup<'_> {
	fn render(&self, section: Option<&str>, values: &RawSection) -> Result<Value, LoadError> {
		let mut rendered = Map::new();
		for (key, raw) in values {
			let value = match raw {
				Some(raw) => Value::String(self.interpolate(section, key, raw, 1)?),
				None => Value::Null,
			};
			rendered.insert(key.clone(), value);
		}
		Ok(Value::Map(rendered))
	}

	/// Raw value of `key` in `section` (or the defaults), falling back to defaults.
	fn raw(&self, section: Option<&str>, key: &str) -> Option<&str> {
		section
			.and_then(|name| self.sections.get(name))
			.and_then(|values| values.get(key))
			.or_else(|| self.defaults.get(key))
			.and_then(Option::as_deref)
	}

	fn interpolate(
		&self,
		section: Option<&str>,
		key: &str,
		raw: &str,
		depth: usize,
	) -> Result<String, LoadError> {
		if depth > MAX_INTERPOLATION_DEPTH {
			return Err(LoadError::loading(format!(
				"can't load ini file: interpolation of {key:?} is too deeply nested"
			)));
		}
		match self.interpolation {
			Interpolation::None => Ok(raw.to_string()),
			Interpolation::Basic => self.basic(section, key, raw, depth),
			Interpolation::Extended => self.extended(section, key, raw, depth),
		}
	}

	/// `%(name)s` references and `%%` escapes.
	fn basic(
		&self,
		section: Option<&str>,
		key: &str,
		raw: &str,
		depth: usize,
	) -> Result<String, LoadError> {
		let mut out = String::new();
		let mut rest = raw;
		while let Some(start) = rest.find('%') {
			out.push_str(&rest[..start]);
			rest = &rest[start..];
			if let Some(after) = rest.strip_prefix("%%") {
				out.push('%');
				rest = after;
			} else if let Some(after) = rest.strip_prefix("%(") {
				let end = after.find(")s").filter(|&end| end > 0).ok_or_else(|| {
					interpolation_error(key, "bad interpolation variable reference")
				})?;
				let name = after[..end].to_lowercase();
				let referenced = self
					.raw(section, &name)
					.ok_or_else(|| interpolation_error(key, format!("missing option {name:?}")))?;
				out.push_str(&self.interpolate(section, &name, referenced, depth + 1)?);
				rest = &after[end + 2..];
			} else {
				return Err(interpolation_error(
					key,
					"'%' must be followed by '%' or '('",
				));
			}
		}
		out.push_str(rest);
		Ok(out)
	}

	/// `${name}` / `${section:name}` references and `$$` escapes.
	fn extended(
		&self,
		section: Option<&str>,
		key: &str,
		raw: &str,
		depth: usize,
	) -> Result<String, LoadError> {
		let mut out = String::new();
		let mut rest = raw;
		while let Some(start) = rest.find('$') {
			out.push_str(&rest[..start]);
			rest = &rest[start..];
			if let Some(after) = rest.strip_prefix("$$") {
				out.push('$');
				rest = after;
			} else if let Some(after) = rest.strip_prefix("${") {
				let end = after.find('}').ok_or_else(|| {
					interpolation_error(key, "bad interpolation variable reference")
				})?;
				let path: Vec<&str> = after[..end].split(':').collect();
				let (target, name) = match path.as_slice() {
					[name] => (section, name.to_lowercase()),
					[target, name] => (Some(*target), name.to_lowercase()),
					_ => {
						return Err(interpolation_error(
							key,
							format!("more than one ':' in {:?}", &after[..end]),
						));
					}
				};
				let referenced = self.raw(target, &name).ok_or_else(|| {
					interpolation_error(key, format!("missing option {name:?}"))
				})?;
				out.push_str(&self.interpolate(target, &name, referenced, depth + 1)?);
				rest = &after[end + 1..];
			} else {
				return Err(interpolation_error(
					key,
					"'$' must be followed by '$' or '{'",
				));
			}
		}
		out.push_str(rest);
		Ok(out)
	}
}

fn interpolation_error(key: &str, reason: impl std::fmt::Display) -> LoadError {
	LoadError::loading(format!("can't load ini file: interpolating {key:?}: {reason}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options(pairs: &[(&str, &str)]) -> Options {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	fn lookup<'a>(value: &'a Value, section: &str, key: &str) -> Option<&'a Value> {
		value.get(section).and_then(|s| s.get(key))
	}

	#[test]
	fn test_sections_and_defaults() {
		let text = "\
[DEFAULT]
ServerAliveInterval = 45

[forge.example]
User: hg

[topsecret.server.example]
Port = 50022
";
		let value = load_ini(text, &Options::new()).unwrap();

		assert_eq!(
			lookup(&value, "forge.example", "user"),
			Some(&Value::from("hg"))
		);
		assert_eq!(
			lookup(&value, "topsecret.server.example", "serveraliveinterval"),
			Some(&Value::from("45"))
		);
		assert_eq!(
			lookup(&value, "DEFAULT", "serveraliveinterval"),
			Some(&Value::from("45"))
		);
	}

	#[test]
	fn test_multiline_values() {
		let text = "[section]\nkey = first\n  second\n\n  third\nother = x\n";
		let value = load_ini(text, &Options::new()).unwrap();
		assert_eq!(
			lookup(&value, "section", "key"),
			Some(&Value::from("first\nsecond\n\nthird"))
		);

		let value = load_ini(text, &options(&[("empty_lines_in_values", "false")]));
		// "  third" no longer continues the value and has no delimiter
		assert!(value.is_err());
	}

	#[test]
	fn test_comments() {
		let text = "# leading\n[s]\n; full line\na = 1 # trailing\n";
		let value = load_ini(text, &Options::new()).unwrap();
		assert_eq!(lookup(&value, "s", "a"), Some(&Value::from("1 # trailing")));

		let value = load_ini(text, &options(&[("inline_comment_prefixes", r##"["#"]"##)])).unwrap();
		assert_eq!(lookup(&value, "s", "a"), Some(&Value::from("1")));
	}

	#[test]
	fn test_allow_no_value() {
		let text = "[mysqld]\nskip-bdb\nuser = mysql\n";
		assert!(load_ini(text, &Options::new()).is_err());

		let value = load_ini(text, &options(&[("allow_no_value", "")])).unwrap();
		assert_eq!(lookup(&value, "mysqld", "skip-bdb"), Some(&Value::Null));
		assert_eq!(lookup(&value, "mysqld", "user"), Some(&Value::from("mysql")));
	}

	#[test]
	fn test_custom_delimiters_and_default_section() {
		let text = "[base]\nname -> value\n[x]\nother -> 1\n";
		let value = load_ini(
			text,
			&options(&[("delimiters", r#"["->"]"#), ("default_section", "base")]),
		)
		.unwrap();
		assert_eq!(lookup(&value, "x", "name"), Some(&Value::from("value")));
		assert_eq!(lookup(&value, "base", "name"), Some(&Value::from("value")));
	}

	#[test]
	fn test_strict_duplicates() {
		let text = "[a]\nk = 1\nk = 2\n";
		assert!(load_ini(text, &Options::new()).is_err());

		let value = load_ini(text, &options(&[("strict", "no")])).unwrap();
		assert_eq!(lookup(&value, "a", "k"), Some(&Value::from("2")));

		assert!(load_ini("[a]\n[a]\n", &Options::new()).is_err());
	}

	#[test]
	fn test_missing_section_header() {
		assert!(matches!(
			load_ini("key = value\n", &Options::new()).unwrap_err(),
			LoadError::Loading { .. }
		));
	}

	#[test]
	fn test_basic_interpolation() {
		let text = "[paths]\nhome_dir = /Users\nmy_dir = %(home_dir)s/lumberjack\nrate = 100%%\n";
		let value = load_ini(text, &Options::new()).unwrap();
		assert_eq!(
			lookup(&value, "paths", "my_dir"),
			Some(&Value::from("/Users/lumberjack"))
		);
		assert_eq!(lookup(&value, "paths", "rate"), Some(&Value::from("100%")));

		let value = load_ini(text, &options(&[("interpolation", "none")])).unwrap();
		assert_eq!(
			lookup(&value, "paths", "my_dir"),
			Some(&Value::from("%(home_dir)s/lumberjack"))
		);

		assert!(load_ini("[a]\nk = %(missing)s\n", &Options::new()).is_err());
		assert!(load_ini("[a]\nk = 5%\n", &Options::new()).is_err());
	}

	#[test]
	fn test_extended_interpolation() {
		let text = "\
[common]
home = /home
[frameworks]
path = ${common:home}/frameworks
cost = $$5
self = ${path}/python
";
		let value = load_ini(text, &options(&[("interpolation", "Extended")])).unwrap();
		assert_eq!(
			lookup(&value, "frameworks", "path"),
			Some(&Value::from("/home/frameworks"))
		);
		assert_eq!(lookup(&value, "frameworks", "cost"), Some(&Value::from("$5")));
		assert_eq!(
			lookup(&value, "frameworks", "self"),
			Some(&Value::from("/home/frameworks/python"))
		);
	}

	#[test]
	fn test_recursive_interpolation_is_bounded() {
		let text = "[a]\nx = %(y)s\ny = %(x)s\n";
		assert!(load_ini(text, &Options::new()).is_err());
	}

	#[test]
	fn test_bad_options() {
		assert!(matches!(
			load_ini("", &options(&[("interpolation", "fancy")])).unwrap_err(),
			LoadError::OptionParse { .. }
		));
		assert!(matches!(
			load_ini("", &options(&[("delimiters", "=")])).unwrap_err(),
			LoadError::OptionParse { .. }
		));
	}
}
