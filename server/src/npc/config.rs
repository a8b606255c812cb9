//! Entity configuration of NPCs.

use npc_shared::BBox;

use crate::entities::{EntityConfig, Player, PlayerConfig};
use crate::world::{EntityData, EntityHandle};

/// Configures NPCs as players that are never persisted. Everything else is
/// taken from the regular player configuration.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct NpcConfig {
    base: PlayerConfig,
}

impl EntityConfig for NpcConfig {
    fn bbox(&self, p: &Player) -> BBox {
        self.base.bbox(p)
    }

    fn encode_entity(&self) -> &'static str {
        self.base.encode_entity()
    }

    fn network_offset(&self) -> f64 {
        self.base.network_offset()
    }

    fn encode_data(&self, _p: &Player) -> Option<Vec<u8>> {
        None
    }

    fn decode_data(&self, _data: &[u8]) -> Option<EntityData> {
        None
    }

    fn open(&self, handle: EntityHandle, data: EntityData) -> Player {
        self.base.open(handle, data)
    }
}
