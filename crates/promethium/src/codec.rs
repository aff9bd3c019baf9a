//! Base64 codec and artifact decoding.
//!
//! Molecule inputs are sent to the API as base64 strings, and workflow
//! results embed named artifacts (optimized geometries, conformer sets, logs)
//! the same way. Every artifact carries an `encoding` tag so the result schema
//! can grow new encodings; this client understands only `base64` and refuses
//! anything else by name.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::error::{PromethiumError, PromethiumResult};

/// The one artifact encoding this client can decode.
pub const BASE64_ENCODING: &str = "base64";

/// Character set applied to decoded bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    /// Strict UTF-8; invalid sequences are a decode error.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to one code point.
    Latin1,
}

/// Output of [`decode`]: text when a charset was requested, raw bytes otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    Bytes(Vec<u8>),
}

impl Decoded {
    /// Borrow the decoded content as bytes, whichever form it takes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Decoded::Text(s) => s.as_bytes(),
            Decoded::Bytes(b) => b,
        }
    }

    /// Return the text form, if this was decoded with a charset.
    pub fn into_text(self) -> Option<String> {
        match self {
            Decoded::Text(s) => Some(s),
            Decoded::Bytes(_) => None,
        }
    }
}

/// Base64-encode text or bytes. Never fails.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    BASE64.encode(data.as_ref())
}

/// Decode a base64 string, then optionally apply a charset.
///
/// `Some(charset)` yields [`Decoded::Text`]; `None` yields the raw bytes.
pub fn decode(data: &str, text_decoding: Option<Charset>) -> PromethiumResult<Decoded> {
    let bytes = decode_bytes(data)?;
    match text_decoding {
        None => Ok(Decoded::Bytes(bytes)),
        Some(Charset::Utf8) => utf8(bytes).map(Decoded::Text),
        Some(Charset::Latin1) => Ok(Decoded::Text(bytes.iter().map(|&b| b as char).collect())),
    }
}

fn utf8(bytes: Vec<u8>) -> PromethiumResult<String> {
    String::from_utf8(bytes)
        .map_err(|e| PromethiumError::Decode(format!("decoded bytes are not UTF-8: {e}")))
}

/// Decode a base64 string to raw bytes.
pub fn decode_bytes(data: &str) -> PromethiumResult<Vec<u8>> {
    BASE64
        .decode(data.trim().as_bytes())
        .map_err(|e| PromethiumError::Decode(format!("{}: {e}", truncate(data, 64))))
}

/// Decode a base64 string as UTF-8 text.
pub fn decode_text(data: &str) -> PromethiumResult<String> {
    utf8(decode_bytes(data)?)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}

/// A named blob embedded in a workflow result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Encoding tag, e.g. `"base64"`.
    pub encoding: String,
    /// Encoded payload. Older results name this field `base64data`.
    #[serde(alias = "base64data")]
    pub data: String,
    /// Declared file type of the decoded content (`xyz`, `sdf`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
}

impl Artifact {
    /// Encode raw content as a base64 artifact.
    pub fn base64(data: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: BASE64_ENCODING.to_string(),
            data: encode(data),
            filetype: None,
        }
    }

    /// Decode the payload to raw bytes.
    pub fn decode_bytes(&self) -> PromethiumResult<Vec<u8>> {
        self.check_encoding()?;
        decode_bytes(&self.data)
    }

    /// Decode the payload as UTF-8 text.
    pub fn decode_text(&self) -> PromethiumResult<String> {
        self.check_encoding()?;
        decode_text(&self.data)
    }

    fn check_encoding(&self) -> PromethiumResult<()> {
        if self.encoding == BASE64_ENCODING {
            Ok(())
        } else {
            Err(PromethiumError::UnsupportedEncoding(self.encoding.clone()))
        }
    }
}

/// Decode an artifact to text, dispatching on its encoding tag.
pub fn decode_artifact(artifact: &Artifact) -> PromethiumResult<String> {
    artifact.decode_text()
}
