//! Encoding and decoding of errors across the engine's string channel
//!
//! The embedded engine can only propagate a single string per fault, so a
//! script-raised error packs its message, status code and optional content
//! type into one string joined by a reserved separator. The engine itself
//! prefixes that string with a fixed diagnostic marker and the global line
//! number before the first colon. [`decode`] undoes both layers and
//! produces a typed [`ScriptError`]; the encoded form never travels past
//! the session boundary.
//!
//! Known limitation: a user message that itself contains the reserved
//! separator (or the diagnostic marker followed by a colon) will be split
//! at the wrong place and its segments misattributed. The separator was
//! chosen to make that unlikely in ordinary text; it is not escaped.

use rhai::{Engine, EvalAltResult, Position};

use crate::error::ScriptError;
use crate::source_map::SourceMap;

/// Reserved token joining the parts of a script-raised error
pub(crate) const SEPARATOR: &str = " || ";

/// Diagnostic marker the engine boundary places before the global line
pub(crate) const FAULT_MARKER: &str = "script fault, line ";

/// Status sentinel meaning "internal, not HTTP"
const INTERNAL_SENTINEL: i64 = -1;

pub(crate) fn encode_internal(msg: &str) -> String {
    format!("{msg}{SEPARATOR}{INTERNAL_SENTINEL}")
}

pub(crate) fn encode_http(msg: &str, code: i64) -> String {
    format!("{msg}{SEPARATOR}{code}")
}

pub(crate) fn encode_http_with_encoding(msg: &str, code: i64, encoding: &str) -> String {
    format!("{msg}{SEPARATOR}{code}{SEPARATOR}{encoding}")
}

/// Render a fault payload into the single-string wire form
pub(crate) fn to_wire(global_line: usize, payload: &str) -> String {
    format!("{FAULT_MARKER}{global_line}: {payload}")
}

/// Decode a raw engine fault string into a typed error
///
/// The global line number is read from the marker prefix before the first
/// colon, then the remainder is split on the reserved separator:
///
/// - one part: a genuine engine fault; position it via `sources` when one
///   is available, otherwise surface the bare message
/// - two parts: script-raised; the second part is the status code (`-1`
///   means internal, anything unparseable defaults to 500)
/// - three parts: as above plus a content type
pub fn decode(raw: &str, sources: Option<&SourceMap>) -> ScriptError {
    let Some(colon) = raw.find(':') else {
        return ScriptError::Internal(raw.to_string());
    };

    let line = raw[..colon]
        .rsplit(' ')
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    let rest = raw[colon + 1..].strip_prefix(' ').unwrap_or(&raw[colon + 1..]);
    if rest.is_empty() {
        return ScriptError::Internal(raw.to_string());
    }

    let parts: Vec<&str> = rest.split(SEPARATOR).collect();
    match parts.len() {
        1 => {
            let message = parts[0].to_string();
            match sources.map(|s| s.resolve(line)) {
                Some(Ok((fragment, relative))) => ScriptError::Positioned {
                    message,
                    fragment,
                    line: relative,
                },
                _ => ScriptError::Internal(message),
            }
        }
        2 => {
            let status = parse_status(parts[1]);
            if status == INTERNAL_SENTINEL {
                ScriptError::Internal(parts[0].to_string())
            } else {
                ScriptError::Http {
                    message: parts[0].to_string(),
                    status: clamp_status(status),
                }
            }
        }
        _ => {
            let status = parse_status(parts[1]);
            if status == INTERNAL_SENTINEL {
                ScriptError::Internal(parts[0].to_string())
            } else {
                ScriptError::HttpWithEncoding {
                    message: parts[0].to_string(),
                    status: clamp_status(status),
                    encoding: parts[2].to_string(),
                }
            }
        }
    }
}

fn parse_status(part: &str) -> i64 {
    part.trim().parse().unwrap_or(500)
}

fn clamp_status(status: i64) -> u16 {
    u16::try_from(status).unwrap_or(500)
}

fn raise(payload: String) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(payload.into(), Position::NONE).into()
}

/// Register the `custom_error` constructor on an engine
///
/// Script surface:
///
/// ```text
/// custom_error("broken")                                  // internal
/// custom_error("not here", 404)                           // HTTP status
/// custom_error("{\"msg\":\"no\"}", 418, "application/json")
/// ```
pub(crate) fn register(engine: &mut Engine) {
    engine.register_fn("custom_error", || -> Result<(), Box<EvalAltResult>> {
        Err(raise(ScriptError::NeedsArguments.to_string()))
    });
    engine.register_fn("custom_error", |msg: &str| -> Result<(), Box<EvalAltResult>> {
        Err(raise(encode_internal(msg)))
    });
    engine.register_fn(
        "custom_error",
        |msg: &str, code: i64| -> Result<(), Box<EvalAltResult>> {
            Err(raise(encode_http(msg, code)))
        },
    );
    engine.register_fn(
        "custom_error",
        |msg: &str, code: f64| -> Result<(), Box<EvalAltResult>> {
            Err(raise(encode_http(msg, code as i64)))
        },
    );
    engine.register_fn(
        "custom_error",
        |msg: &str, code: i64, encoding: &str| -> Result<(), Box<EvalAltResult>> {
            Err(raise(encode_http_with_encoding(msg, code, encoding)))
        },
    );
}
