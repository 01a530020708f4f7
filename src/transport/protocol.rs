//! Request envelope and response message types.
//!
//! A request payload is either raw JSON, or carries the literal marker
//! `ck_json=` followed by a form-URL-encoded JSON document (everything
//! before the marker is ignored). All envelope fields are optional at the
//! decode layer; each dispatcher branch enforces its own required fields so
//! that "field absent" is distinguishable from "field present but empty".

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, STATUS_OK};

/// Marker introducing a form-URL-encoded JSON payload.
pub const CK_JSON_KEY: &[u8] = b"ck_json=";

/// Decoded request envelope. Top-level wire fields, all optional.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    pub secretkey: Option<String>,
    pub action: Option<String>,
    pub filename: Option<String>,
    pub file_content_base64: Option<String>,
    pub cmd: Option<String>,
    pub parameters: Option<Parameters>,
}

/// Nested `parameters` object (used by the `state` action).
#[derive(Debug, Default, Deserialize)]
pub struct Parameters {
    #[serde(rename = "runUUID")]
    pub run_uuid: Option<String>,
}

/// Response messages, serialized flat with a `return` status code in every
/// shape. Error responses additionally carry an `error` message.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// Bare acknowledgment (`state`, `clear`).
    Ack {
        #[serde(rename = "return")]
        status: &'static str,
    },
    /// Successful `push`: a freshly minted opaque identifier.
    Push {
        #[serde(rename = "return")]
        status: &'static str,
        #[serde(rename = "compileUUID")]
        compile_uuid: String,
    },
    /// Successful `pull`: the file content, base64-encoded.
    Pull {
        #[serde(rename = "return")]
        status: &'static str,
        filename: String,
        file_content_base64: String,
    },
    /// Successful `shell`: exit code plus captured output.
    Shell {
        #[serde(rename = "return")]
        status: &'static str,
        return_code: i32,
        stdout: String,
        stderr: String,
    },
    /// Any request-scoped failure.
    Error {
        #[serde(rename = "return")]
        status: &'static str,
        error: String,
    },
}

impl Response {
    /// Bare success acknowledgment.
    pub const fn ack() -> Self {
        Self::Ack { status: STATUS_OK }
    }

    /// Error response for a failed request.
    pub fn error(err: &RequestError) -> Self {
        Self::Error {
            status: err.status_code(),
            error: err.to_string(),
        }
    }
}

/// Decode a raw request payload into an [`Envelope`].
///
/// If the payload contains `ck_json=`, the remainder is URL-decoded first;
/// otherwise the bytes are parsed as-is. Malformed JSON fails the request
/// before the dispatcher is ever entered.
pub fn decode_request(raw: &[u8]) -> Result<Envelope, RequestError> {
    let decoded;
    let payload: &[u8] = match find_marker(raw, CK_JSON_KEY) {
        Some(idx) => {
            decoded = url_decode(&raw[idx + CK_JSON_KEY.len()..]);
            &decoded
        }
        None => raw,
    };
    Ok(serde_json::from_slice(payload)?)
}

/// Byte-wise substring search. Returns the index of the first occurrence.
fn find_marker(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decode form-URL-encoded bytes: `%XX` percent escapes plus `+` → space.
///
/// Lenient on malformed input: a `%` not followed by two hex digits is
/// passed through literally rather than failing the whole payload.
fn url_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (hex_val(input.get(i + 1)), hex_val(input.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    out
}

fn hex_val(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
