//! Total mappings between electrical/JSON signals and door positions.

use serde_json::Value;

use crate::state::TargetState;

/// Position reported by an "is open" signal, inverted when `reverse` is set.
#[inline]
pub fn position_from_signal(open: bool, reverse: bool) -> TargetState {
    if open != reverse {
        TargetState::Open
    } else {
        TargetState::Closed
    }
}

/// Pin level that makes the relay `active` (or idle), honoring an active-low
/// output.
#[inline]
pub fn drive_level(active: bool, reverse_output: bool) -> bool {
    active != reverse_output
}

/// JSON truthiness: `false`, `null`, `0` and `""` are false, everything else
/// (including empty arrays/objects and the string "false") is true.
pub fn json_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
