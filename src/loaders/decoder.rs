use crate::error::{Attempt, ConfigError, LoadError};
use crate::loaders::options::{Options, ParsedHeader, parse_header};
use crate::loaders::registry::{AUTO_DETECT_ORDER, LoaderRegistry};
use crate::value::Value;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Marks a first line carrying an explicit type declaration.
pub const HEADER_MARKER: &[u8] = b"#type:";

/// Read a file and decode its content.
pub fn decode_file(registry: &LoaderRegistry, path: &Path) -> crate::Result<Value> {
	let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	debug!(path = %path.display(), bytes = bytes.len(), "Decoding file");
	decode_bytes(registry, &bytes).map_err(|source| ConfigError::Load {
		path: path.to_path_buf(),
		source,
	})
}

/// Decode the content of one file.
///
/// A `#type:` first line picks the loader and its options; the rest of the
/// file is decoded with the `encoding` option (UTF-8 by default). Header
/// problems are reported as-is. Without a header every loader of
/// [`AUTO_DETECT_ORDER`] is tried in turn.
pub fn decode_bytes(registry: &LoaderRegistry, bytes: &[u8]) -> Result<Value, LoadError> {
	match bytes.strip_prefix(HEADER_MARKER) {
		Some(rest) => decode_with_header(registry, rest),
		None => auto_detect(registry, &decode_text(bytes, None)?),
	}
}

fn decode_with_header(registry: &LoaderRegistry, rest: &[u8]) -> Result<Value, LoadError> {
	let (line, body) = match rest.iter().position(|&b| b == b'\n') {
		Some(end) => (&rest[..end], &rest[end + 1..]),
		None => (rest, &[][..]),
	};
	let line = line.strip_suffix(b"\r").unwrap_or(line);
	let header = std::str::from_utf8(line)
		.map_err(|e| LoadError::loading_with("header is not valid UTF-8", e))?;

	let ParsedHeader {
		type_name,
		mut options,
	} = parse_header(header)?;
	let encoding = options.remove("encoding");

	// The type is checked before the body so a bad header always wins
	let entry = registry
		.resolve(&type_name)
		.ok_or_else(|| LoadError::Missing {
			name: type_name.clone(),
		})?;
	debug!(loader = %entry.name(), ?options, "Using header type");

	let text = decode_text(body, encoding.as_deref())?;
	entry.decode(&text, &options)
}

fn auto_detect(registry: &LoaderRegistry, text: &str) -> Result<Value, LoadError> {
	let options = Options::new();
	let mut attempts = Vec::with_capacity(AUTO_DETECT_ORDER.len());

	for name in AUTO_DETECT_ORDER {
		let result = match registry.resolve(name) {
			Some(entry) => entry.decode(text, &options),
			None => Err(LoadError::Missing {
				name: name.to_string(),
			}),
		};
		match result {
			Ok(value) => {
				debug!(loader = name, "Detected file type");
				return Ok(value);
			}
			Err(error) => {
				debug!(loader = name, %error, "Auto-detect attempt failed");
				attempts.push(Attempt {
					loader: name.to_string(),
					error,
				});
			}
		}
	}

	Err(LoadError::Aggregate {
		message: "no loader could decode the file".to_string(),
		attempts,
	})
}

/// Decode bytes with an encoding label, UTF-8 when `None`.
fn decode_text(bytes: &[u8], label: Option<&str>) -> Result<String, LoadError> {
	let encoding = match label {
		Some(label) => Encoding::for_label(label.trim().as_bytes())
			.ok_or_else(|| LoadError::loading(format!("unknown encoding {label:?}")))?,
		None => UTF_8,
	};
	encoding
		.decode_without_bom_handling_and_without_replacement(bytes)
		.map(Cow::into_owned)
		.ok_or_else(|| LoadError::loading(format!("can't decode file as {}", encoding.name())))
}
