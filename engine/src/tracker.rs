use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::ids::IdSource;
use crate::minion::{Minion, MinionId, Roster, SpawnData};
use crate::reducer::{MinionAction, reduce_with};
use crate::store::{Persisted, StoreError, Storage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no minion matches '{0}'")]
    NotFound(String),
    #[error("'{prefix}' is ambiguous ({matches} minions match)")]
    Ambiguous { prefix: String, matches: usize },
}

/// Single owner of the roster: every change goes through [`Tracker::dispatch`],
/// which reduces and then mirrors the result to storage.
#[derive(Debug)]
pub struct Tracker<S: Storage> {
    state: Persisted<Roster, S>,
    ids: IdSource,
}

impl<S: Storage> Tracker<S> {
    /// Hydrate the roster from `key` in `storage` (empty if absent or malformed).
    pub fn open(storage: S, key: &str) -> Self {
        let mut tracker = Self {
            state: Persisted::load(storage, key, Roster::new()),
            ids: IdSource::default(),
        };
        let stored = tracker.roster().clone();
        tracker.dispatch(MinionAction::SetAll(stored));
        tracker
    }

    pub fn with_id_source(mut self, ids: IdSource) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.state = self.state.with_pretty(pretty);
        self
    }

    /// Apply one action. Storage is only touched when the roster changed.
    pub fn dispatch(&mut self, action: MinionAction) {
        self.apply(action, None);
    }

    /// Spawn a minion at full health; returns its id.
    pub fn spawn(&mut self, data: SpawnData) -> MinionId {
        let id = unused_id(&mut self.ids, self.state.value());
        let name = data.name.clone();
        self.apply(MinionAction::Spawn(data), Some(id));
        info!(%id, %name, "spawned");
        id
    }

    #[instrument(level = "trace", skip_all, fields(action = action.name()))]
    fn apply(&mut self, action: MinionAction, pinned: Option<MinionId>) {
        let current = self.state.value();
        let ids = &mut self.ids;
        let next = reduce_with(current.clone(), action, || match pinned {
            Some(id) => id,
            None => unused_id(ids, current),
        });
        self.commit(next);
    }

    fn commit(&mut self, next: Roster) {
        if &next != self.state.value() {
            self.state.set(next);
        }
    }

    pub fn replace(&mut self, minion: Minion) {
        self.dispatch(MinionAction::Replace(minion));
    }

    pub fn soft_delete(&mut self, id: MinionId) {
        self.dispatch(MinionAction::SoftDelete { id });
    }

    pub fn adjust_hp(&mut self, id: MinionId, delta: i32) {
        self.dispatch(MinionAction::AdjustHp { id, delta });
    }

    /// Heal by `amount`; non-positive amounts are ignored.
    pub fn heal(&mut self, id: MinionId, amount: i32) {
        if amount > 0 {
            self.adjust_hp(id, amount);
        }
    }

    /// Damage by `amount`; non-positive amounts are ignored.
    pub fn damage(&mut self, id: MinionId, amount: i32) {
        if amount > 0 {
            self.adjust_hp(id, -amount);
        }
    }

    pub fn set_all(&mut self, roster: Roster) {
        self.dispatch(MinionAction::SetAll(roster));
    }

    pub fn roster(&self) -> &Roster {
        self.state.value()
    }

    pub fn active(&self) -> impl Iterator<Item = &Minion> + '_ {
        self.roster().active()
    }

    pub fn find(&self, id: MinionId) -> Option<&Minion> {
        self.roster().get(id)
    }

    /// Find the one minion whose id starts with `prefix` (case-insensitive).
    pub fn resolve(&self, prefix: &str) -> Result<&Minion, LookupError> {
        let needle = prefix.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(LookupError::NotFound(prefix.to_string()));
        }
        let mut hits = self
            .roster()
            .iter()
            .filter(|m| m.id.to_string().starts_with(&needle));
        match (hits.next(), hits.count()) {
            (Some(m), 0) => Ok(m),
            (Some(_), more) => Err(LookupError::Ambiguous {
                prefix: prefix.to_string(),
                matches: more + 1,
            }),
            (None, _) => Err(LookupError::NotFound(prefix.to_string())),
        }
    }

    /// Rewrite the current roster, surfacing storage errors.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.state.flush()
    }

    pub fn storage(&self) -> &S {
        self.state.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.state.storage_mut()
    }
}

/// Next id from `ids` that no minion in `roster` already carries.
fn unused_id(ids: &mut IdSource, roster: &Roster) -> MinionId {
    loop {
        let id = ids.next_id();
        if !roster.contains(id) {
            return id;
        }
        debug!(%id, "drawn id already in roster; drawing again");
    }
}
