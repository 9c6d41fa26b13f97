use crate::error::LoadError;
use std::collections::BTreeMap;

/// Options attached to a header, by name.
pub type Options = BTreeMap<String, String>;

/// A `#type:` header split into its type name and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
	pub type_name: String,
	pub options: Options,
}

/// Split a header string of the form `type : opt=val ; flag ; opt=val`.
///
/// Without a `:` the whole (trimmed) string is the type name. Option names
/// and values are trimmed, a bare name maps to `""`, and `\=` / `\;` never
/// act as separators. Backslash escapes are expanded after splitting.
pub fn parse_header(header: &str) -> Result<ParsedHeader, LoadError> {
	let Some(split) = find_unescaped(header, ':') else {
		return Ok(ParsedHeader {
			type_name: header.trim().to_string(),
			options: Options::new(),
		});
	};

	let type_name = header[..split].trim().to_string();
	let options = parse_options(&type_name, &header[split + 1..])?;
	Ok(ParsedHeader { type_name, options })
}

/// Parse the `;`-separated option list that follows the type name.
///
/// `type_string` is only used to label errors.
pub fn parse_options(type_string: &str, input: &str) -> Result<Options, LoadError> {
	let mut options = Options::new();
	let mut name = String::new();
	let mut value = String::new();
	let mut in_value = false;
	let mut chars = input.chars();

	while let Some(c) = chars.next() {
		match c {
			'\\' => {
				// Keep the escape raw, it is expanded once the entry is complete
				let target = if in_value { &mut value } else { &mut name };
				target.push('\\');
				if let Some(escaped) = chars.next() {
					target.push(escaped);
				}
			}
			'=' if in_value => {
				return Err(LoadError::option_parse(type_string, "double equal sign"));
			}
			'=' => in_value = true,
			';' => {
				push_option(&mut options, type_string, &name, &value)?;
				name.clear();
				value.clear();
				in_value = false;
			}
			_ if in_value => value.push(c),
			_ => name.push(c),
		}
	}
	// "type:" and a trailing ';' leave nothing behind
	if in_value || !name.trim().is_empty() {
		push_option(&mut options, type_string, &name, &value)?;
	}

	Ok(options)
}

fn push_option(
	options: &mut Options,
	type_string: &str,
	name: &str,
	value: &str,
) -> Result<(), LoadError> {
	let name = unescape(name.trim())
		.map_err(|reason| LoadError::option_parse(type_string, reason))?;
	if name.is_empty() {
		return Err(LoadError::option_parse(type_string, "missing option name"));
	}
	let value = unescape(value.trim())
		.map_err(|reason| LoadError::option_parse(type_string, reason))?;
	options.insert(name, value);
	Ok(())
}

/// Byte index of the first `target` not preceded by a backslash escape.
fn find_unescaped(input: &str, target: char) -> Option<usize> {
	let mut escaped = false;
	for (i, c) in input.char_indices() {
		if escaped {
			escaped = false;
		} else if c == '\\' {
			escaped = true;
		} else if c == target {
			return Some(i);
		}
	}
	None
}

/// Expand backslash escape sequences. Unknown escapes are kept verbatim.
pub fn unescape(input: &str) -> Result<String, String> {
	let mut out = String::with_capacity(input.len());
	let mut chars = input.chars();

	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		let Some(escaped) = chars.next() else {
			out.push('\\');
			break;
		};
		match escaped {
			'n' => out.push('\n'),
			't' => out.push('\t'),
			'r' => out.push('\r'),
			'0' => out.push('\0'),
			'a' => out.push('\u{07}'),
			'b' => out.push('\u{08}'),
			'f' => out.push('\u{0C}'),
			'v' => out.push('\u{0B}'),
			'\\' | '\'' | '"' | '=' | ';' | ':' => out.push(escaped),
			'x' => out.push(hex_escape(&mut chars, 2)?),
			'u' => out.push(hex_escape(&mut chars, 4)?),
			'U' => out.push(hex_escape(&mut chars, 8)?),
			other => {
				out.push('\\');
				out.push(other);
			}
		}
	}

	Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
	let hex: String = chars.by_ref().take(digits).collect();
	if hex.len() != digits {
		return Err(format!("truncated escape sequence \\{hex}"));
	}
	u32::from_str_radix(&hex, 16)
		.ok()
		.and_then(char::from_u32)
		.ok_or_else(|| format!("invalid escape sequence \\{hex}"))
}
