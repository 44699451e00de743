use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Status of the last call made for one collection.
///
/// Stored in the state as `"init"`, `"loading"`, `"loaded"` or
/// `{"error": "<message>"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    #[default]
    Init,
    Loading,
    Loaded,
    Error(String),
}

impl CallState {
    pub fn is_loading(&self) -> bool {
        matches!(self, CallState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CallState::Loaded)
    }

    /// The message of an `Error` status.
    pub fn error(&self) -> Option<&str> {
        match self {
            CallState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Decode a state value; `None` if it is not a call state.
    pub fn from_value(value: &Value) -> Option<Self> {
        CallState::deserialize(value).ok()
    }
}

impl From<CallState> for Value {
    fn from(state: CallState) -> Self {
        match state {
            CallState::Init => json!("init"),
            CallState::Loading => json!("loading"),
            CallState::Loaded => json!("loaded"),
            CallState::Error(message) => json!({ "error": message }),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Init => f.write_str("init"),
            CallState::Loading => f.write_str("loading"),
            CallState::Loaded => f.write_str("loaded"),
            CallState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_form_matches_serde() {
        for state in [
            CallState::Init,
            CallState::Loading,
            CallState::Loaded,
            CallState::Error("boom".to_string()),
        ] {
            let manual = Value::from(state.clone());
            assert_eq!(serde_json::to_value(&state).ok(), Some(manual.clone()));
            assert_eq!(CallState::from_value(&manual), Some(state));
        }
    }

    #[test]
    fn foreign_values_do_not_decode() {
        assert_eq!(CallState::from_value(&json!(42)), None);
        assert_eq!(CallState::from_value(&json!("pending")), None);
        assert_eq!(CallState::from_value(&json!({ "message": "x" })), None);
    }

    #[test]
    fn accessors() {
        let state = CallState::Error("network down".to_string());
        assert_eq!(state.error(), Some("network down"));
        assert!(!state.is_loading());
        assert!(CallState::Loaded.is_loaded());
        assert_eq!(CallState::default(), CallState::Init);
        assert_eq!(state.to_string(), "error: network down");
    }
}
