//! A flight search store: call state, a filter and the loaded flights.
//!
//! Run with `RUST_LOG=callstate=debug` to see patches being applied.

use callstate::store::{ComputedSlice, StateSignals, StateSlice, StoreFeature};
use callstate::{
    set_error, set_loaded, set_loading, with_named_call_state, Memo, SignalStore, StatePatch,
    StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const COLLECTION: &str = "flight";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Flight {
    id: u32,
    from: String,
    to: String,
}

struct FlightSearch;

impl StoreFeature for FlightSearch {
    fn name(&self) -> &str {
        "flight_search"
    }

    fn initial_state(&self) -> StateSlice {
        StateSlice::from([
            ("flightFilter".to_string(), json!({ "from": "Wien", "to": "" })),
            ("flightEntities".to_string(), json!([])),
        ])
    }

    fn computed(&self, state: &StateSignals) -> Result<ComputedSlice, StoreError> {
        let entities = state.get("flightEntities")?;
        let mut slice = ComputedSlice::new();
        slice.insert(
            "flightCount",
            Memo::new(move || entities.with(|e| e.as_array().map_or(0, Vec::len))),
        );
        Ok(slice)
    }
}

/// Stand-in for a data service.
fn search(from: &str) -> Result<Vec<Flight>, std::io::Error> {
    if from.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "departure airport required",
        ));
    }
    Ok(vec![
        Flight {
            id: 1,
            from: from.to_string(),
            to: "Graz".to_string(),
        },
        Flight {
            id: 2,
            from: from.to_string(),
            to: "Hamburg".to_string(),
        },
    ])
}

fn load(store: &SignalStore, from: &str) -> Result<(), StoreError> {
    store.patch_state(set_loading(Some(COLLECTION)));
    match search(from) {
        Ok(flights) => {
            let entities = serde_json::to_value(&flights).map_err(|source| StoreError::Encode {
                key: "flightEntities".to_string(),
                source,
            })?;
            store.patch_state(
                StatePatch::single("flightEntities", entities).merge(set_loaded(Some(COLLECTION))),
            );
        }
        Err(err) => store.patch_state(set_error(err, Some(COLLECTION))),
    }
    Ok(())
}

fn main() -> Result<(), StoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Flight Store ===\n");

    let store = SignalStore::builder()
        .with_feature(with_named_call_state([COLLECTION]))
        .with_feature(FlightSearch)
        .build()?;

    let call_state = store.call_state(Some(COLLECTION))?;
    let count = store.computed::<usize>("flightCount")?;

    store.subscribe(|state| {
        println!("   [Store Update] flightCallState = {}", state["flightCallState"]);
    });

    println!("1. Searching flights from Wien");
    load(&store, "Wien")?;
    println!(
        "   loaded: {}, flights: {}\n",
        call_state.is_loaded(),
        count.get()
    );

    println!("2. Searching without a departure airport");
    load(&store, "")?;
    println!(
        "   loading: {}, error: {:?}",
        call_state.is_loading(),
        call_state.error()
    );

    let flights: Vec<Flight> = store.state("flightEntities")?;
    println!("\nFlights still in the store: {flights:?}");

    Ok(())
}
