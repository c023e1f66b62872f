//! # Reef Scripting
//!
//! Embedded scripting bridge for the Reef API gateway: lets small
//! operator-authored scripts read and rewrite in-flight request/response
//! data at defined pipeline stages.
//!
//! ## What lives here
//!
//! - **Value bridge** - lossless conversion between pipeline values and
//!   script values, including the integral/float split and the canonical
//!   array-detection rule
//! - **Dynamic containers** - growable tables and lists whose handles
//!   alias shared storage across the language boundary
//! - **Error codec** - the engine's single-string fault channel decoded
//!   into typed, positioned errors that can carry an HTTP status code and
//!   content type
//! - **Source map** - global-to-relative line resolution across every
//!   fragment fed into a session
//! - **Execution session** - one engine per invocation, wiring the above
//!   together with the caller's collaborator registrars
//!
//! ## One session per invocation
//!
//! Sessions are synchronous, single-threaded and never reused. Create one,
//! bind host data, run the configured sources and inline code, read the
//! results back, drop it.
//!
//! ```no_run
//! use reef_scripting::prelude::*;
//! use serde_json::json;
//!
//! fn stage(extra_config: &serde_json::Value) -> Result<serde_json::Value> {
//!     let cfg = ScriptConfig::parse(extra_config, "scripting")?;
//!     let mut session = Session::new(Vec::new());
//!     session.bind("request", &json!({"path": "/v1/users"}));
//!     session.load_sources(&cfg)?;
//!     session.run_pre(&cfg.pre)?;
//!     // ... pipeline performs its own stage here ...
//!     session.run_post(&cfg.post)?;
//!     Ok(session.read("request").unwrap_or_default())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
mod json;
pub mod list;
pub mod session;
pub mod source_map;
pub mod table;
pub mod value;

pub use bridge::{host_to_script, script_to_host, UpstreamHttpError};
pub use config::{LiveLoader, OnceLoader, ScriptConfig, SourceLoader};
pub use error::{Result, ScriptError};
pub use list::DynList;
pub use session::{Registrar, Session, POST_SCRIPT, PRE_SCRIPT};
pub use source_map::SourceMap;
pub use table::DynTable;
pub use value::Value;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::bridge::{host_to_script, script_to_host, UpstreamHttpError};
    pub use crate::config::{ScriptConfig, SourceLoader};
    pub use crate::error::{Result, ScriptError};
    pub use crate::list::DynList;
    pub use crate::session::{Registrar, Session};
    pub use crate::source_map::SourceMap;
    pub use crate::table::DynTable;
    pub use crate::value::Value;
}
