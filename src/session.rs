//! One engine instance per pipeline invocation
//!
//! A [`Session`] owns a single engine, a persistent scope and one
//! [`SourceMap`]. It is confined to the invocation that created it: the
//! engine, the containers bound into it and any projected host data are
//! not safe to share across concurrent invocations. Ownership gives the
//! release guarantee the pipeline needs; dropping the session releases the
//! engine on every exit path, success or failure alike.
//!
//! Fragments execute synchronously and fail fast: the first fault abandons
//! the session, there is no partial rollback and no retry. Every engine
//! fault is decoded exactly once, here, into a [`ScriptError`].

use rhai::{Engine, EvalAltResult, AST};

use crate::bridge;
use crate::codec;
use crate::config::ScriptConfig;
use crate::error::{Result, ScriptError};
use crate::source_map::SourceMap;
use crate::value::Value;
use crate::{json, list, table};

use tracing::{debug, trace};

/// Fixed fragment name for inline code run before the pipeline stage
pub const PRE_SCRIPT: &str = "pre-script";

/// Fixed fragment name for inline code run after the pipeline stage
pub const POST_SCRIPT: &str = "post-script";

/// Hook registering extra script surface on a session's engine
///
/// The pipeline passes collaborator tables (outbound HTTP, request and
/// response projections) as an explicit ordered list of these; there is no
/// process-wide registry.
pub type Registrar = Box<dyn FnOnce(&mut Engine)>;

/// One engine instance plus its registered bindings, covering exactly one
/// pipeline invocation
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    scope: rhai::Scope<'static>,
    // Functions accumulated from executed fragments; statements are
    // stripped after each run so earlier fragments never re-execute
    lib: AST,
    sources: SourceMap,
}

impl Session {
    /// Create a session and register its script surface
    ///
    /// Core bindings (`custom_error`, containers, JSON bridge) come first,
    /// then the caller's registrars in the order given.
    pub fn new(registrars: Vec<Registrar>) -> Self {
        let mut engine = Engine::new();
        codec::register(&mut engine);
        table::register(&mut engine);
        list::register(&mut engine);
        json::register(&mut engine);
        for registrar in registrars {
            registrar(&mut engine);
        }
        Self {
            engine,
            scope: rhai::Scope::new(),
            lib: AST::empty(),
            sources: SourceMap::new(),
        }
    }

    /// Project a host value into the session under `name`
    ///
    /// The returned value holds the same container handles the script will
    /// mutate, so the caller can read results back through it (or via
    /// [`read`](Session::read)) after execution.
    pub fn bind(&mut self, name: &str, value: &serde_json::Value) -> Value {
        trace!(binding = name, "projecting host value into session");
        let projected = bridge::host_to_script(value);
        self.scope
            .push_dynamic(name.to_string(), projected.clone().into_dynamic());
        projected
    }

    /// Read a scope variable back as host data
    pub fn read(&self, name: &str) -> Option<serde_json::Value> {
        self.scope
            .get(name)
            .map(|d| bridge::script_to_host(&Value::from_dynamic(d.clone())))
    }

    /// Load and execute every configured source, in order, failing fast
    ///
    /// A configured name with no backing content is fatal to the session.
    pub fn load_sources(&mut self, cfg: &ScriptConfig) -> Result<()> {
        for name in &cfg.sources {
            let Some(src) = cfg.get(name) else {
                return Err(ScriptError::UnknownSource(name.clone()));
            };
            self.run_fragment(name, &src)?;
        }
        Ok(())
    }

    /// Execute inline pre code under its fixed synthetic fragment name
    pub fn run_pre(&mut self, code: &str) -> Result<()> {
        self.run_fragment(PRE_SCRIPT, code)
    }

    /// Execute inline post code under its fixed synthetic fragment name
    ///
    /// Post code lands in the same source map as everything before it, so
    /// line numbers stay globally addressable across the whole session.
    pub fn run_post(&mut self, code: &str) -> Result<()> {
        self.run_fragment(POST_SCRIPT, code)
    }

    /// Execute one named fragment of script text
    ///
    /// State persists across fragments: top-level variables stay in the
    /// session scope and function definitions remain callable from later
    /// fragments.
    pub fn run_fragment(&mut self, name: &str, code: &str) -> Result<()> {
        let offset = self.sources.total_lines();
        self.sources.append(name, code);

        let ast = match self.engine.compile(code) {
            Ok(ast) => ast,
            Err(e) => {
                let line = offset + e.1.line().unwrap_or(1);
                let wire = codec::to_wire(line, &e.0.to_string());
                return Err(codec::decode(&wire, Some(&self.sources)));
            }
        };

        let combined = self.lib.merge(&ast);
        if let Err(e) = self.engine.run_ast_with_scope(&mut self.scope, &combined) {
            return Err(self.decode_engine_error(&e, offset));
        }
        self.lib = combined.clone_functions_only();

        debug!(fragment = name, total_lines = self.sources.total_lines(), "fragment executed");
        Ok(())
    }

    /// Fragments registered so far, for callers that decode positions of
    /// their own
    pub fn source_map(&self) -> &SourceMap {
        &self.sources
    }

    fn decode_engine_error(&self, err: &EvalAltResult, offset: usize) -> ScriptError {
        let local = fault_line(err).unwrap_or(1);
        let payload = fault_payload(err);
        let wire = codec::to_wire(offset + local, &payload);
        codec::decode(&wire, Some(&self.sources))
    }
}

fn fault_line(err: &EvalAltResult) -> Option<usize> {
    if let Some(line) = err.position().line() {
        return Some(line);
    }
    if let EvalAltResult::ErrorInFunctionCall(_, _, inner, _) = err {
        return fault_line(inner);
    }
    None
}

/// The single string a fault carries across the engine boundary
///
/// A script-raised error travels as the runtime error's payload; genuine
/// engine faults fall back to their rendered message with the engine's own
/// position suffix stripped (the source map owns positioning).
fn fault_payload(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorRuntime(payload, _) => payload.to_string(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => fault_payload(inner),
        other => {
            let mut message = other.to_string();
            if let Some(i) = message.rfind(" (line ") {
                message.truncate(i);
            }
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OnceLoader;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn host_value_mutations_are_read_back() {
        let mut session = Session::new(Vec::new());
        session.bind(
            "request",
            &json!({"path": "/v1", "headers": {"Accept": "text/plain"}}),
        );
        session
            .run_fragment(
                "rewrite.rhai",
                r#"
                request.set("path", "/v2");
                request.get("headers").set("Accept", "application/json");
                "#,
            )
            .unwrap();

        assert_eq!(
            session.read("request").unwrap(),
            json!({"path": "/v2", "headers": {"Accept": "application/json"}})
        );
    }

    #[test]
    fn functions_persist_across_fragments() {
        let mut session = Session::new(Vec::new());
        session.bind("response", &json!({"status": 200}));
        session
            .run_fragment("lib.rhai", r#"fn tag(t) { t.set("tagged", true); }"#)
            .unwrap();
        session.run_pre(r#"tag(response);"#).unwrap();

        assert_eq!(
            session.read("response").unwrap(),
            json!({"status": 200, "tagged": true})
        );
    }

    #[test]
    fn statements_do_not_rerun_on_later_fragments() {
        let mut session = Session::new(Vec::new());
        session.run_fragment("counter.rhai", "let hits = 0; hits += 1;").unwrap();
        session.run_pre("hits += 1;").unwrap();
        assert_eq!(session.read("hits").unwrap(), json!(2));
    }

    #[test]
    fn custom_error_internal() {
        let mut session = Session::new(Vec::new());
        let err = session.run_pre(r#"custom_error("expect me")"#).unwrap_err();
        assert_eq!(err, ScriptError::Internal("expect me".to_string()));
    }

    #[test]
    fn custom_error_http() {
        let mut session = Session::new(Vec::new());
        let err = session
            .run_pre(r#"custom_error("expect me", 404)"#)
            .unwrap_err();
        assert_eq!(
            err,
            ScriptError::Http {
                message: "expect me".to_string(),
                status: 404,
            }
        );
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn custom_error_http_with_encoding() {
        let mut session = Session::new(Vec::new());
        let err = session
            .run_pre(r#"custom_error("{\"msg\":\"expect me\"}", 404, "application/json")"#)
            .unwrap_err();
        assert_eq!(
            err,
            ScriptError::HttpWithEncoding {
                message: "{\"msg\":\"expect me\"}".to_string(),
                status: 404,
                encoding: "application/json".to_string(),
            }
        );
    }

    #[test]
    fn custom_error_without_arguments_reports_arity() {
        let mut session = Session::new(Vec::new());
        let err = session.run_pre("custom_error()").unwrap_err();
        assert!(err.to_string().contains("need arguments"));
    }

    #[test]
    fn syntax_fault_is_positioned_across_fragments() {
        let mut session = Session::new(Vec::new());
        session
            .run_fragment("ok.rhai", "let x = 1;\nlet y = 2;")
            .unwrap();
        let err = session
            .run_fragment("scripts/bad.rhai", "let a = 1;\nlet b = ;")
            .unwrap_err();

        let ScriptError::Positioned { fragment, line, .. } = &err else {
            panic!("expected a positioned fault, got {err:?}");
        };
        assert_eq!(fragment, "bad.rhai");
        assert_eq!(*line, 2);
        assert!(err.to_string().ends_with("(bad.rhai:L2)"));
    }

    #[test]
    fn runtime_fault_is_positioned() {
        let mut session = Session::new(Vec::new());
        let err = session
            .run_fragment("boom.rhai", "let a = 1;\nnot_defined();")
            .unwrap_err();

        let ScriptError::Positioned { fragment, line, .. } = &err else {
            panic!("expected a positioned fault, got {err:?}");
        };
        assert_eq!(fragment, "boom.rhai");
        assert_eq!(*line, 2);
    }

    #[test]
    fn post_code_shares_the_source_map() {
        let mut session = Session::new(Vec::new());
        session
            .run_fragment("lib.rhai", "let x = 1;\nlet y = 2;\nlet z = 3;")
            .unwrap();
        session.run_pre("let p = 1;").unwrap();
        let err = session.run_post("let q = 1;\ncustom_error()").unwrap_err();

        // lib (3 lines) + pre (1 line) precede the post fragment, whose
        // fault lands on its own second line
        let ScriptError::Positioned { fragment, line, .. } = &err else {
            panic!("expected a positioned fault, got {err:?}");
        };
        assert_eq!(fragment, POST_SCRIPT);
        assert_eq!(*line, 2);
    }

    #[test]
    fn missing_configured_source_is_fatal() {
        let mut cfg = ScriptConfig::default();
        cfg.sources = vec!["present.rhai".to_string(), "absent.rhai".to_string()];
        let cfg = cfg.with_loader(Arc::new(OnceLoader::from_map(
            [("present.rhai".to_string(), "let ok = true;".to_string())].into(),
        )));

        let mut session = Session::new(Vec::new());
        assert_eq!(
            session.load_sources(&cfg).unwrap_err(),
            ScriptError::UnknownSource("absent.rhai".to_string())
        );
    }

    #[test]
    fn configured_sources_execute_in_order() {
        let mut cfg = ScriptConfig::default();
        cfg.sources = vec!["first.rhai".to_string(), "second.rhai".to_string()];
        cfg.pre = "let total = base + extra;".to_string();
        let cfg = cfg.with_loader(Arc::new(OnceLoader::from_map(
            [
                ("first.rhai".to_string(), "let base = 40;".to_string()),
                ("second.rhai".to_string(), "let extra = 2;".to_string()),
            ]
            .into(),
        )));

        let mut session = Session::new(Vec::new());
        session.load_sources(&cfg).unwrap();
        session.run_pre(&cfg.pre).unwrap();
        assert_eq!(session.read("total").unwrap(), json!(42));
    }

    #[test]
    fn caller_registrars_extend_the_surface() {
        let registrar: Registrar = Box::new(|engine: &mut Engine| {
            engine.register_fn("gateway_name", || "reef".to_string());
        });
        let mut session = Session::new(vec![registrar]);
        session.run_pre("let name = gateway_name();").unwrap();
        assert_eq!(session.read("name").unwrap(), json!("reef"));
    }

    #[test]
    fn scripts_mix_native_and_dynamic_containers() {
        let mut session = Session::new(Vec::new());
        session
            .run_fragment(
                "mixed.rhai",
                r#"
                let t = dyn_table();
                t.set("items", #{"0": "x", "1": "y"});
                t.set("meta", #{"kind": "demo"});
                "#,
            )
            .unwrap();

        // The native map with a 0-based integer run converts to a list
        assert_eq!(
            session.read("t").unwrap(),
            json!({"items": ["x", "y"], "meta": {"kind": "demo"}})
        );
    }
}
