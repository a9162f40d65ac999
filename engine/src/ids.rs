use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Builder;

use crate::minion::MinionId;

/// Where fresh minion ids come from.
#[derive(Debug, Default)]
pub enum IdSource {
    /// OS randomness (UUID v4).
    #[default]
    Random,
    /// Deterministic v4 UUIDs drawn from a seeded stream.
    Seeded(ChaCha8Rng),
}

impl IdSource {
    pub fn from_seed(seed: u64) -> Self {
        Self::Seeded(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn next_id(&mut self) -> MinionId {
        match self {
            IdSource::Random => MinionId::new_v4(),
            IdSource::Seeded(rng) => {
                let mut bytes = [0u8; 16];
                rng.fill_bytes(&mut bytes);
                MinionId::from_uuid(Builder::from_random_bytes(bytes).into_uuid())
            }
        }
    }
}
