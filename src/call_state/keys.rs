/// The four store keys used for one collection's call state.
///
/// The default collection uses the bare names (`callState`, `loading`,
/// `loaded`, `error`); a named collection prefixes them, so `flight` yields
/// `flightCallState`, `flightLoading`, `flightLoaded` and `flightError`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallStateKeys {
    pub status: String,
    pub loading: String,
    pub loaded: String,
    pub error: String,
}

impl CallStateKeys {
    pub fn new(collection: &str) -> Self {
        Self {
            status: scoped_key(collection, "callState"),
            loading: scoped_key(collection, "loading"),
            loaded: scoped_key(collection, "loaded"),
            error: scoped_key(collection, "error"),
        }
    }
}

impl Default for CallStateKeys {
    fn default() -> Self {
        Self::new("")
    }
}

/// Derive the keys for `collection`. `None` and `Some("")` both mean the
/// default collection.
pub fn call_state_keys(collection: Option<&str>) -> CallStateKeys {
    CallStateKeys::new(collection.unwrap_or_default())
}

fn scoped_key(collection: &str, base: &str) -> String {
    if collection.is_empty() {
        return base.to_string();
    }
    let mut chars = base.chars();
    let mut key = String::with_capacity(collection.len() + base.len());
    key.push_str(collection);
    if let Some(first) = chars.next() {
        key.extend(first.to_uppercase());
        key.push_str(chars.as_str());
    }
    key
}
