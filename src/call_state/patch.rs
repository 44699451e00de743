use crate::call_state::keys::call_state_keys;
use crate::call_state::status::CallState;
use crate::error::StoreError;
use crate::store::StatePatch;
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// Patch marking `collection` as loading.
pub fn set_loading(collection: Option<&str>) -> StatePatch {
    status_patch(collection, CallState::Loading)
}

/// Patch marking `collection` as loaded.
pub fn set_loaded(collection: Option<&str>) -> StatePatch {
    status_patch(collection, CallState::Loaded)
}

/// Patch recording a failed call for `collection`.
///
/// See [`ErrorMessage`] for how the message is taken from `error`.
pub fn set_error(error: impl Into<ErrorMessage>, collection: Option<&str>) -> StatePatch {
    let message = error.into();
    status_patch(collection, CallState::Error(message.0))
}

fn status_patch(collection: Option<&str>, state: CallState) -> StatePatch {
    StatePatch::single(call_state_keys(collection).status, state)
}

/// The message stored in an error call state.
///
/// Absent and falsy values (`None`, `null`, `false`, `0`, `""`) give an empty
/// message. Errors give their display text, JSON objects their `message`
/// property, and anything else its string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessage(String);

impl ErrorMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Message of any error value.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        Self(error.to_string())
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ErrorMessage {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&String> for ErrorMessage {
    fn from(message: &String) -> Self {
        Self(message.clone())
    }
}

impl<T: Into<ErrorMessage>> From<Option<T>> for ErrorMessage {
    fn from(error: Option<T>) -> Self {
        error.map(Into::into).unwrap_or_default()
    }
}

impl From<&Value> for ErrorMessage {
    fn from(error: &Value) -> Self {
        if is_falsy(error) {
            return Self::default();
        }
        match error {
            Value::Object(fields) => match fields.get("message") {
                Some(message) => Self(stringify(message)),
                None => Self(stringify(error)),
            },
            other => Self(stringify(other)),
        }
    }
}

impl From<Value> for ErrorMessage {
    fn from(error: Value) -> Self {
        Self::from(&error)
    }
}

impl<'a> From<&'a (dyn Error + 'a)> for ErrorMessage {
    fn from(error: &'a (dyn Error + 'a)) -> Self {
        Self::from_error(error)
    }
}

impl<'a> From<&'a (dyn Error + Send + Sync + 'a)> for ErrorMessage {
    fn from(error: &'a (dyn Error + Send + Sync + 'a)) -> Self {
        Self::from_error(error)
    }
}

impl From<Box<dyn Error + Send + Sync>> for ErrorMessage {
    fn from(error: Box<dyn Error + Send + Sync>) -> Self {
        Self::from_error(error.as_ref())
    }
}

impl From<std::io::Error> for ErrorMessage {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error)
    }
}

impl From<serde_json::Error> for ErrorMessage {
    fn from(error: serde_json::Error) -> Self {
        Self::from_error(&error)
    }
}

impl From<StoreError> for ErrorMessage {
    fn from(error: StoreError) -> Self {
        Self::from_error(&error)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// String form of a JSON value, the way a script runtime would print it.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(patch: &StatePatch, key: &str) -> Option<String> {
        patch
            .get(key)
            .and_then(CallState::from_value)
            .and_then(|state| state.error().map(str::to_string))
    }

    #[test]
    fn loading_and_loaded_patches() {
        assert_eq!(set_loading(None), StatePatch::single("callState", "loading"));
        assert_eq!(
            set_loaded(Some("flight")),
            StatePatch::single("flightCallState", "loaded")
        );
        assert_eq!(set_loading(Some("")), set_loading(None));
    }

    #[test]
    fn error_message_precedence() {
        assert_eq!(message(&set_error(None::<&str>, None), "callState").as_deref(), Some(""));
        assert_eq!(message(&set_error("boom", None), "callState").as_deref(), Some("boom"));
        assert_eq!(
            message(&set_error(json!({ "message": "boom" }), Some("hotel")), "hotelCallState")
                .as_deref(),
            Some("boom")
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(message(&set_error(io, None), "callState").as_deref(), Some("boom"));
    }

    #[test]
    fn falsy_values_give_empty_message() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert_eq!(ErrorMessage::from(&value).as_str(), "", "{value}");
        }
    }

    #[test]
    fn values_are_stringified() {
        assert_eq!(ErrorMessage::from(json!(404)).as_str(), "404");
        assert_eq!(ErrorMessage::from(json!(1.5)).as_str(), "1.5");
        assert_eq!(ErrorMessage::from(json!(true)).as_str(), "true");
        assert_eq!(ErrorMessage::from(json!([1, null, "a"])).as_str(), "1,,a");
        assert_eq!(ErrorMessage::from(json!({ "code": 7 })).as_str(), "[object Object]");
        assert_eq!(ErrorMessage::from(json!({ "message": 7 })).as_str(), "7");
        assert_eq!(ErrorMessage::from(json!({ "message": null })).as_str(), "null");
    }

    #[test]
    fn boxed_and_store_errors_use_display() {
        let boxed: Box<dyn Error + Send + Sync> = "timeout".into();
        assert_eq!(ErrorMessage::from(boxed).as_str(), "timeout");

        let err = StoreError::UnknownStateKey {
            key: "flightCallState".to_string(),
        };
        assert_eq!(
            ErrorMessage::from(err).into_string(),
            "unknown state key `flightCallState`"
        );
    }
}
