//! Python scripts, executed by an external interpreter.
//!
//! The script runs in a fresh namespace and its top-level names become the
//! keys of the resulting map. Running a script executes arbitrary code, so
//! the loader only has a dangerous variant.

use crate::error::LoadError;
use crate::exec::{find_interpreter, run_with_input};
use crate::loaders::options::Options;
use crate::loaders::registry::Decoder;
use crate::value::{Map, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use num_bigint::BigInt;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming the interpreter to run.
pub const INTERPRETER_ENV_VAR: &str = "MODCONF_PYTHON";

const CANDIDATES: [&str; 2] = ["python3", "python"];

/// Reads the script from stdin and dumps its globals as strict JSON.
///
/// Values JSON can't carry exactly travel as single-key marker objects.
const RUNNER: &str = r#"
import base64, json, math, sys

def key(k):
    if isinstance(k, str):
        return k
    if k is None or isinstance(k, (bool, int, float)):
        return json.dumps(k)
    return repr(k)

def encode(obj):
    if obj is None or isinstance(obj, (bool, str)):
        return obj
    if isinstance(obj, int):
        if -2**63 <= obj < 2**64:
            return obj
        return {"__int__": str(obj)}
    if isinstance(obj, float):
        return obj if math.isfinite(obj) else {"__float__": repr(obj)}
    if isinstance(obj, complex):
        return {"__complex__": [encode(obj.real), encode(obj.imag)]}
    if isinstance(obj, (bytes, bytearray)):
        return {"__bytes__": base64.b64encode(bytes(obj)).decode("ascii")}
    if isinstance(obj, dict):
        return {key(k): encode(v) for k, v in obj.items()}
    if isinstance(obj, (list, tuple, set, frozenset)):
        return [encode(v) for v in obj]
    return repr(obj)

namespace = {}
exec(compile(sys.stdin.read(), "<config>", "exec"), namespace)
namespace.pop("__builtins__", None)
json.dump(encode(namespace), sys.stdout, allow_nan=False)
"#;

#[derive(Debug, Clone, Default)]
pub struct PythonLoader {
	interpreter: Option<PathBuf>,
}

impl PythonLoader {
	/// Use the interpreter from `MODCONF_PYTHON`, or `python3`/`python` on PATH.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
		PythonLoader {
			interpreter: Some(interpreter.into()),
		}
	}

	fn interpreter(&self) -> Result<PathBuf, LoadError> {
		match self.interpreter {
			Some(ref path) => Ok(path.clone()),
			None => find_interpreter(INTERPRETER_ENV_VAR, &CANDIDATES)
				.ok_or_else(|| LoadError::loading("can't find a python interpreter")),
		}
	}
}

impl Decoder for PythonLoader {
	fn decode(&self, text: &str, _options: &Options) -> Result<Value, LoadError> {
		let interpreter = self.interpreter()?;
		debug!(interpreter = %interpreter.display(), "Running python script");

		let output = run_with_input(&interpreter, &["-I", "-c", RUNNER], text.as_bytes())
			.map_err(|e| LoadError::loading_with("can't run the python interpreter", e))?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			let reason = stderr
				.lines()
				.rev()
				.find(|line| !line.trim().is_empty())
				.unwrap_or("interpreter exited with an error");
			return Err(LoadError::loading(format!(
				"python script failed: {}",
				reason.trim()
			)));
		}

		let json: serde_json::Value = serde_json::from_slice(&output.stdout)
			.map_err(|e| LoadError::loading_with("can't read the python script's globals", e))?;
		from_python(json)
	}
}

/// Like `Value::from(serde_json::Value)`, restoring the runner's markers.
fn from_python(json: serde_json::Value) -> Result<Value, LoadError> {
	Ok(match json {
		serde_json::Value::Array(items) => Value::List(
			items
				.into_iter()
				.map(from_python)
				.collect::<Result<_, _>>()?,
		),
		serde_json::Value::Object(object) => {
			if object.len() == 1
				&& let Some(serde_json::Value::Array(parts)) = object.get("__complex__")
				&& let [re, im] = parts.as_slice()
				&& let (Some(re), Some(im)) = (python_float(re), python_float(im))
			{
				return Ok(Value::Complex { re, im });
			}
			if object.len() == 1
				&& let Some(serde_json::Value::String(digits)) = object.get("__int__")
			{
				let int = digits
					.parse::<BigInt>()
					.map_err(|e| LoadError::loading_with("can't read an integer from python", e))?;
				return Ok(Value::from(int));
			}
			if object.len() == 1
				&& let Some(serde_json::Value::String(text)) = object.get("__float__")
				&& let Ok(float) = text.parse::<f64>()
			{
				return Ok(Value::Float(float));
			}
			if object.len() == 1
				&& let Some(serde_json::Value::String(encoded)) = object.get("__bytes__")
			{
				let bytes = STANDARD
					.decode(encoded)
					.map_err(|e| LoadError::loading_with("can't read bytes from python", e))?;
				return Ok(Value::Bytes(bytes));
			}
			let mut map = Map::new();
			for (key, value) in object {
				map.insert(key, from_python(value)?);
			}
			Value::Map(map)
		}
		scalar => Value::from(scalar),
	})
}

/// A JSON number, or a `{"__float__": "inf"}` marker for non-finite floats.
fn python_float(json: &serde_json::Value) -> Option<f64> {
	match json {
		serde_json::Value::Object(object) if object.len() == 1 => match object.get("__float__")? {
			serde_json::Value::String(text) => text.parse().ok(),
			_ => None,
		},
		other => other.as_f64(),
	}
}
