//! Source fragment bookkeeping for error attribution
//!
//! Every piece of script text fed into a session (configured sources,
//! inline pre/post code) is registered here in execution order. The engine
//! reports fault positions as global line numbers over that concatenation;
//! [`SourceMap::resolve`] walks the fragments back to the one that owns a
//! given line so diagnostics can name the real file and relative line.

use crate::error::{Result, ScriptError};

/// One named, line-counted unit of script text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment {
    name: String,
    lines: usize,
}

/// Ordered, append-only list of source fragments
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    fragments: Vec<Fragment>,
}

impl SourceMap {
    /// Create an empty source map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fragment of script text under `name`
    ///
    /// Trailing newlines do not produce lines of their own, so they are
    /// trimmed before counting.
    pub fn append(&mut self, name: &str, src: &str) {
        let trimmed = src.trim_matches('\n');
        let lines = trimmed.matches('\n').count() + 1;
        self.fragments.push(Fragment {
            name: name.to_string(),
            lines,
        });
    }

    /// Total number of lines across all registered fragments
    pub fn total_lines(&self) -> usize {
        self.fragments.iter().map(|f| f.lines).sum()
    }

    /// Resolve a global line number to `(base_name, relative_line)`
    ///
    /// Lines are 1-based; line zero never belongs to a fragment. The base
    /// name strips any directory component; diagnostics must not leak
    /// filesystem layout.
    pub fn resolve(&self, line: usize) -> Result<(String, usize)> {
        if line == 0 {
            return Err(ScriptError::LineOutOfBounds(0));
        }
        let mut count = 0;
        for fragment in &self.fragments {
            count += fragment.lines;
            if count >= line {
                let relative = fragment.lines - (count - line);
                return Ok((base_name(&fragment.name).to_string(), relative));
            }
        }
        Err(ScriptError::LineOutOfBounds(line))
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
