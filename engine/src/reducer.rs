use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::minion::{Minion, MinionId, Roster, SpawnData};

/// Every state transition the roster supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MinionAction {
    Spawn(SpawnData),
    AdjustHp { id: MinionId, delta: i32 },
    Replace(Minion),
    SoftDelete { id: MinionId },
    SetAll(Roster),
}

impl MinionAction {
    pub fn name(&self) -> &'static str {
        match self {
            MinionAction::Spawn(_) => "spawn",
            MinionAction::AdjustHp { .. } => "adjust_hp",
            MinionAction::Replace(_) => "replace",
            MinionAction::SoftDelete { .. } => "soft_delete",
            MinionAction::SetAll(_) => "set_all",
        }
    }
}

/// Apply `action` to `roster`, drawing fresh ids from UUID v4.
pub fn reduce(roster: Roster, action: MinionAction) -> Roster {
    reduce_with(roster, action, MinionId::new_v4)
}

/// Apply `action` to `roster`. Total over all inputs: actions naming an id
/// that is not in the roster return it unchanged.
pub fn reduce_with(
    mut roster: Roster,
    action: MinionAction,
    mut next_id: impl FnMut() -> MinionId,
) -> Roster {
    match action {
        MinionAction::Spawn(data) => {
            let minion = Minion::spawn(next_id(), data);
            debug!(id = %minion.id, name = %minion.name, hp = minion.hp, "spawned minion");
            roster.push(minion);
        }
        MinionAction::AdjustHp { id, delta } => match roster.get_mut(id) {
            Some(minion) => {
                let before = minion.hp;
                minion.hp = minion.clamped_hp(delta);
                debug!(%id, before, after = minion.hp, delta, "adjusted hp");
            }
            None => debug!(%id, delta, "adjust_hp: unknown id, ignoring"),
        },
        MinionAction::Replace(replacement) => match roster.get_mut(replacement.id) {
            Some(minion) => {
                trace!(id = %replacement.id, "replaced minion");
                *minion = replacement;
            }
            None => debug!(id = %replacement.id, "replace: unknown id, ignoring"),
        },
        MinionAction::SoftDelete { id } => match roster.get_mut(id) {
            Some(minion) => {
                minion.active = false;
                debug!(%id, "dismissed minion");
            }
            None => debug!(%id, "soft_delete: unknown id, ignoring"),
        },
        MinionAction::SetAll(next) => {
            trace!(len = next.len(), "roster replaced wholesale");
            roster = next;
        }
    }
    roster
}
