//! Script execution error types

/// Script execution result type alias using [`ScriptError`]
pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

/// Script execution error
///
/// Every failure that can leave the scripting subsystem is one of these
/// variants. Engine faults are decoded exactly once, at the session
/// boundary, so nothing outside this crate ever sees the raw engine
/// error string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// A script binding was called with the wrong number of arguments
    #[error("need arguments")]
    NeedsArguments,

    /// Syntax or runtime fault raised by the engine itself, resolved to
    /// the source fragment that owns the offending line
    #[error("{message} ({fragment}:L{line})")]
    Positioned {
        /// Error message as reported by the engine
        message: String,
        /// Base name of the owning source fragment
        fragment: String,
        /// Line number relative to that fragment
        line: usize,
    },

    /// Script-raised error with no HTTP semantics
    #[error("{0}")]
    Internal(String),

    /// Script-raised error carrying an HTTP status code
    #[error("{message}")]
    Http {
        /// Error message chosen by the script
        message: String,
        /// HTTP status code chosen by the script
        status: u16,
    },

    /// Script-raised error carrying an HTTP status code and a content type
    #[error("{message}")]
    HttpWithEncoding {
        /// Error message chosen by the script
        message: String,
        /// HTTP status code chosen by the script
        status: u16,
        /// Content type for the error body
        encoding: String,
    },

    /// A configured source name has no backing content
    #[error("unable to load required source {0}")]
    UnknownSource(String),

    /// A configured source did not match its expected checksum
    #[error("wrong checksum for source {name}. have: {actual}, want: {expected}")]
    ChecksumMismatch {
        /// Source name from the configuration
        name: String,
        /// Checksum computed over the loaded content
        actual: String,
        /// Checksum declared in the configuration
        expected: String,
    },

    /// A global line number does not fall inside any registered fragment
    #[error("line {0} out of bounds")]
    LineOutOfBounds(usize),

    /// The extra-config block has no scripting namespace
    #[error("no scripting config")]
    NoScriptConfig,

    /// The scripting namespace exists but cannot be parsed
    #[error("invalid scripting config: {0}")]
    WrongScriptConfig(String),
}

impl ScriptError {
    /// HTTP status code carried by script-raised errors, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::HttpWithEncoding { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Content type carried by the error, if any
    pub fn encoding(&self) -> Option<&str> {
        match self {
            Self::HttpWithEncoding { encoding, .. } => Some(encoding),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positioned_rendering_includes_fragment_and_line() {
        let err = ScriptError::Positioned {
            message: "attempt to call a nil value".to_string(),
            fragment: "checks.rhai".to_string(),
            line: 7,
        };
        assert_eq!(err.to_string(), "attempt to call a nil value (checks.rhai:L7)");
    }

    #[test]
    fn errors_have_no_implicit_source_chain() {
        // Field names must not collide with thiserror's implicit error
        // source detection; every variant here is a leaf
        use std::error::Error as _;
        let positioned = ScriptError::Positioned {
            message: "boom".to_string(),
            fragment: "x.rhai".to_string(),
            line: 1,
        };
        assert!(positioned.source().is_none());

        let mismatch = ScriptError::ChecksumMismatch {
            name: "x.rhai".to_string(),
            actual: "aa".to_string(),
            expected: "bb".to_string(),
        };
        assert!(mismatch.source().is_none());
    }

    #[test]
    fn status_and_encoding_accessors() {
        let err = ScriptError::HttpWithEncoding {
            message: "{\"msg\":\"nope\"}".to_string(),
            status: 418,
            encoding: "application/json".to_string(),
        };
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.encoding(), Some("application/json"));

        assert_eq!(ScriptError::Internal("x".to_string()).status_code(), None);
    }
}
