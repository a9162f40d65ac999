use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque minion identifier. Serialized as the hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinionId(Uuid);

impl MinionId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MinionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for MinionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Payload of a spawn: everything a minion has except the fields the
/// reducer assigns (`id`, `max_hp`, `active`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnData {
    pub name: String,
    pub hp: i32,
    pub ac: i32,
    pub attack: i32,
    #[serde(default)]
    pub damage: String,
    #[serde(default)]
    pub notes: String,
}

/// One tracked combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minion {
    pub id: MinionId,
    pub name: String,
    pub hp: i32, // 0..=max_hp
    pub max_hp: i32,
    pub ac: i32,
    pub attack: i32,
    #[serde(default)]
    pub damage: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Minion {
    /// Build a fresh, active minion at full health.
    pub fn spawn(id: MinionId, data: SpawnData) -> Self {
        Self {
            id,
            name: data.name,
            hp: data.hp,
            max_hp: data.hp,
            ac: data.ac,
            attack: data.attack,
            damage: data.damage,
            notes: data.notes,
            active: true,
        }
    }

    /// Display-only: at or below half of max HP.
    pub fn is_low_hp(&self) -> bool {
        // hp <= max_hp / 2 with real division, without going through floats.
        i64::from(self.hp) * 2 <= i64::from(self.max_hp)
    }

    /// HP after applying `delta`, clamped into `0..=max_hp`.
    pub fn clamped_hp(&self, delta: i32) -> i32 {
        self.hp.saturating_add(delta).min(self.max_hp).max(0)
    }
}

/// The ordered collection of every minion, active or dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<Minion>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: MinionId) -> Option<&Minion> {
        self.0.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MinionId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Minion> {
        self.0.iter()
    }

    /// Minions still on the board, in insertion order.
    pub fn active(&self) -> impl Iterator<Item = &Minion> + '_ {
        self.0.iter().filter(|m| m.active)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn as_slice(&self) -> &[Minion] {
        &self.0
    }

    pub(crate) fn push(&mut self, minion: Minion) {
        self.0.push(minion);
    }

    pub(crate) fn get_mut(&mut self, id: MinionId) -> Option<&mut Minion> {
        self.0.iter_mut().find(|m| m.id == id)
    }
}

impl From<Vec<Minion>> for Roster {
    fn from(minions: Vec<Minion>) -> Self {
        Self(minions)
    }
}

impl From<Roster> for Vec<Minion> {
    fn from(roster: Roster) -> Self {
        roster.0
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Minion;
    type IntoIter = std::slice::Iter<'a, Minion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goblin(hp: i32, max_hp: i32) -> Minion {
        Minion {
            id: MinionId::new_v4(),
            name: "Goblin".into(),
            hp,
            max_hp,
            ac: 13,
            attack: 4,
            damage: "1d6+2".into(),
            notes: String::new(),
            active: true,
        }
    }

    #[test]
    fn low_hp_uses_real_half() {
        assert!(goblin(3, 7).is_low_hp());
        assert!(!goblin(4, 7).is_low_hp());
        assert!(goblin(4, 8).is_low_hp());
        assert!(goblin(0, 7).is_low_hp());
    }

    #[test]
    fn clamped_hp_saturates() {
        let g = goblin(5, 7);
        assert_eq!(g.clamped_hp(i32::MAX), 7);
        assert_eq!(g.clamped_hp(i32::MIN), 0);
        assert_eq!(g.clamped_hp(-2), 3);
    }

    #[test]
    fn id_parses_its_own_display() {
        let id = MinionId::new_v4();
        let parsed: MinionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
