//! Binary payloads carried as base64 text.

use crate::error::LoadError;
use crate::loaders::builtin::scalar::parse_bool;
use crate::loaders::options::Options;
use crate::value::Value;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Standard alphabet, padding required, stray trailing bits tolerated.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_decode_allow_trailing_bits(true)
		.with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Decode base64 text into bytes.
///
/// Options:
/// - `altchars`: two characters used instead of `+` and `/`
/// - `validate`: reject characters outside the alphabet instead of skipping
///   them; a bare `validate` is a flag, otherwise the value is a boolean
pub fn load_base64(text: &str, options: &Options) -> Result<Value, LoadError> {
	let mut encoded: String = match options.get("altchars") {
		Some(altchars) => {
			let (plus, slash) = parse_altchars(altchars)?;
			text.chars()
				.map(|c| match c {
					c if c == plus => '+',
					c if c == slash => '/',
					c => c,
				})
				.collect()
		}
		None => text.to_string(),
	};

	if validate_flag(options)? {
		if let Some(bad) = encoded.chars().find(|&c| !is_alphabet(c)) {
			return Err(LoadError::loading(format!(
				"can't decode base64: invalid character {bad:?}"
			)));
		}
		let data = encoded.trim_end_matches('=');
		if data.contains('=') || encoded.len() - data.len() > 2 {
			return Err(LoadError::loading("can't decode base64: misplaced padding"));
		}
	} else {
		encoded.retain(is_alphabet);
	}

	ENGINE
		.decode(encoded.as_bytes())
		.map(Value::Bytes)
		.map_err(|e| LoadError::loading_with("can't decode base64", e))
}

fn is_alphabet(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

fn parse_altchars(altchars: &str) -> Result<(char, char), LoadError> {
	let chars: Vec<char> = altchars.chars().collect();
	match chars.as_slice() {
		[plus, slash] => Ok((*plus, *slash)),
		_ => Err(LoadError::option_parse(
			"base64",
			format!("altchars must be exactly two characters, got {altchars:?}"),
		)),
	}
}

fn validate_flag(options: &Options) -> Result<bool, LoadError> {
	match options.get("validate").map(String::as_str) {
		None => Ok(false),
		Some("") => Ok(true),
		Some(value) => parse_bool(value).ok_or_else(|| {
			LoadError::option_parse("base64", format!("validate must be a boolean, got {value:?}"))
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use base64::engine::general_purpose::{STANDARD, URL_SAFE};

	fn options(pairs: &[(&str, &str)]) -> Options {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_round_trip_bytes() {
		let data: Vec<u8> = (0..=255u8).cycle().take(2500).collect();
		let encoded = STANDARD.encode(&data);
		assert_eq!(
			load_base64(&encoded, &Options::new()).unwrap(),
			Value::Bytes(data)
		);
	}

	#[test]
	fn test_skips_newlines_without_validate() {
		let value = load_base64("aGVs\nbG8=\n", &Options::new()).unwrap();
		assert_eq!(value.as_bytes(), Some(&b"hello"[..]));
	}

	#[test]
	fn test_validate_flag_rejects_stray_characters() {
		let err = load_base64("aGVs\nbG8=", &options(&[("validate", "")])).unwrap_err();
		assert!(matches!(err, LoadError::Loading { .. }));

		let value = load_base64("aGVsbG8=", &options(&[("validate", "yes")])).unwrap();
		assert_eq!(value.as_bytes(), Some(&b"hello"[..]));

		let value = load_base64("aGVs\nbG8=", &options(&[("validate", "false")])).unwrap();
		assert_eq!(value.as_bytes(), Some(&b"hello"[..]));
	}

	#[test]
	fn test_bad_padding() {
		assert!(matches!(
			load_base64("aGVsbG8", &Options::new()).unwrap_err(),
			LoadError::Loading { .. }
		));
	}

	#[test]
	fn test_altchars() {
		let data = vec![0xfb, 0xff, 0xfe];
		let encoded = URL_SAFE.encode(&data);
		assert!(encoded.contains('-') || encoded.contains('_'));

		let value = load_base64(&encoded, &options(&[("altchars", "-_")])).unwrap();
		assert_eq!(value, Value::Bytes(data));
	}

	#[test]
	fn test_invalid_options() {
		assert!(matches!(
			load_base64("", &options(&[("altchars", "-")])).unwrap_err(),
			LoadError::OptionParse { .. }
		));
		assert!(matches!(
			load_base64("", &options(&[("validate", "sometimes")])).unwrap_err(),
			LoadError::OptionParse { .. }
		));
	}
}
