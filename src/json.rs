//! JSON surface for scripts, built directly on the value bridge

use rhai::{Dynamic, Engine, EvalAltResult, Position};

use crate::bridge;
use crate::value::Value;

fn runtime_error(msg: String) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(msg.into(), Position::NONE).into()
}

/// Register `marshal` and `unmarshal` on an engine
///
/// `unmarshal(text)` decodes JSON text into dynamic containers (objects
/// become tables, arrays become lists) so decoded data obeys the same
/// aliasing rules as everything else crossing the bridge. `marshal(value)`
/// is the inverse, accepting scalars, containers and native script values.
pub(crate) fn register(engine: &mut Engine) {
    engine.register_fn(
        "unmarshal",
        |text: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            serde_json::from_str::<serde_json::Value>(text)
                .map(|v| bridge::host_to_script(&v).into_dynamic())
                .map_err(|e| runtime_error(e.to_string()))
        },
    );
    engine.register_fn(
        "marshal",
        |value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let host = bridge::script_to_host(&Value::from_dynamic(value));
            serde_json::to_string_pretty(&host).map_err(|e| runtime_error(e.to_string()))
        },
    );
}
