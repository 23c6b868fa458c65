//! Inbound request decoding.
//!
//! The preview turns a button click into an address like
//! `scheme://publisher.ext/run?cmd=<base64>&lang=bash&nonce=<token>`.
//! This module takes that apart. It never decides whether to run anything;
//! that is the Airlock's job.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use std::borrow::Cow;
use std::collections::HashMap;
use url::Url;

use crate::error::RequestError;
use crate::RunAction;

/// Standard alphabet; padding optional, like the browser side produces.
const COMMAND_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// A decoded, shape-checked request. Not yet authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub action: RunAction,
    pub command: String,
    pub language: String,
    /// Capability token, empty when absent.
    pub nonce: String,
}

/// `/run` or `/type`. Anything else is not ours.
pub fn parse_action(path: &str) -> Option<RunAction> {
    match path {
        "/run" => Some(RunAction::Run),
        "/type" => Some(RunAction::Type),
        _ => None,
    }
}

/// Parse an address and return its `(path, query)`. The query is the raw,
/// still-encoded text; the fragment is dropped.
pub fn split_uri(uri: &str) -> Result<(String, String), RequestError> {
    let parsed = Url::parse(uri.trim())?;
    Ok((
        parsed.path().to_string(),
        parsed.query().unwrap_or_default().to_string(),
    ))
}

/// The action an address asks for, if it is a request we answer at all.
pub fn request_action(uri: &str) -> Option<RunAction> {
    split_uri(uri).ok().and_then(|(path, _)| parse_action(&path))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Strict percent-decoding: every `%` must start a valid escape and the
/// result must be UTF-8. `+` is left alone.
pub fn percent_decode_strict(input: &str) -> Result<String, RequestError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            match (hi, lo) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => return Err(RequestError::MalformedPercentEncoding(i)),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| RequestError::MalformedPercentEncoding(e.utf8_error().valid_up_to()))
}

/// Decode the query once. On malformed input fall back to the raw text.
pub fn decode_query(raw: &str) -> Cow<'_, str> {
    match percent_decode_strict(raw) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(e) => {
            tracing::debug!("query is not cleanly percent-encoded ({}), using it as-is", e);
            Cow::Borrowed(raw)
        }
    }
}

/// Split on `&`, then on the first `=`. Values are taken verbatim.
pub fn parse_query_pairs(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if !key.is_empty() {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

pub fn decode_command(encoded: &str) -> Result<String, RequestError> {
    let bytes = COMMAND_B64.decode(encoded.trim())?;
    let command = String::from_utf8(bytes)?;
    if command.is_empty() {
        return Err(RequestError::EmptyCommand);
    }
    Ok(command)
}

/// Decode a `(path, query)` pair.
///
/// `Ok(None)` means the path is not one we answer to.
pub fn decode_request(path: &str, raw_query: &str) -> Result<Option<InboundRequest>, RequestError> {
    let Some(action) = parse_action(path) else {
        return Ok(None);
    };

    let query = decode_query(raw_query);
    let mut params = parse_query_pairs(&query);

    let encoded = params.remove("cmd").unwrap_or_default();
    if encoded.is_empty() {
        return Err(RequestError::MissingCommand);
    }
    let command = decode_command(&encoded)?;

    Ok(Some(InboundRequest {
        action,
        command,
        language: params.remove("lang").unwrap_or_default(),
        nonce: params.remove("nonce").unwrap_or_default(),
    }))
}

pub fn decode_uri(uri: &str) -> Result<Option<InboundRequest>, RequestError> {
    let (path, query) = split_uri(uri)?;
    decode_request(&path, &query)
}

/// Percent-encode everything outside the unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => {
                out.push('%');
                out.push(HEX_UPPER[(b >> 4) as usize] as char);
                out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
            }
        }
    }
    out
}

/// Build the address the preview sends for a click.
///
/// `base` is `scheme://authority` with no trailing slash. The command is
/// base64 so `&`, `=` and friends in it survive the query string.
pub fn build_request_uri(base: &str, action: &str, command: &str, language: &str, nonce: &str) -> String {
    let action = match action {
        "type" => "type",
        _ => "run",
    };
    format!(
        "{}/{}?cmd={}&lang={}&nonce={}",
        base.trim_end_matches('/'),
        action,
        COMMAND_B64.encode(command.as_bytes()),
        percent_encode(language),
        percent_encode(nonce)
    )
}
