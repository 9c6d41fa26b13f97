//! Decoding file content.
//!
//! This module handles:
//! - Parsing `#type:` header options
//! - The registry mapping type names to decoders
//! - The built-in loaders
//! - Dispatch from raw file bytes to a loader, with auto-detection

pub mod builtin;
pub mod decoder;
pub mod options;
pub mod registry;

pub use decoder::{decode_bytes, decode_file};
pub use options::{Options, ParsedHeader, parse_header, parse_options};
pub use registry::{AUTO_DETECT_ORDER, Decoder, Loader, LoaderEntry, LoaderRegistry};
