pub mod config;
pub mod ids;
pub mod minion;
pub mod reducer;
pub mod store;
pub mod tracker;

pub use config::TrackerConfig;
pub use ids::IdSource;
pub use minion::{Minion, MinionId, Roster, SpawnData};
pub use reducer::{MinionAction, reduce, reduce_with};
pub use store::{DEFAULT_KEY, FileStorage, MemoryStorage, Persisted, Storage, StoreError};
pub use tracker::{LookupError, Tracker};

/* ---------------- serialization helpers ---------------- */

/// Serialize a roster the way it is persisted.
pub fn to_json(roster: &Roster, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(roster)
    } else {
        serde_json::to_string(roster)
    }
}

/// Parse a persisted roster.
pub fn from_json(text: &str) -> serde_json::Result<Roster> {
    serde_json::from_str(text)
}
