//! Entity type configuration.
//!
//! An [`EntityConfig`] describes everything about an entity type that is not
//! per-entity state: its hitbox, its network identity, how it is persisted and
//! how it is opened from [`EntityData`] when added to a world.

use log::warn;

use npc_shared::BBox;

use super::Player;
use crate::world::{EntityData, EntityHandle};

/// Capabilities of an entity type
pub trait EntityConfig: Send + Sync {
    /// Unscaled bounding box of an entity in its current state
    fn bbox(&self, p: &Player) -> BBox;

    /// Network identifier of the entity type
    fn encode_entity(&self) -> &'static str;

    /// Vertical offset between the entity position and the position sent to clients
    fn network_offset(&self) -> f64;

    /// Serialise an entity for persistence. None means it is never saved.
    fn encode_data(&self, p: &Player) -> Option<Vec<u8>>;

    /// Read back data written by [`EntityConfig::encode_data`]
    fn decode_data(&self, data: &[u8]) -> Option<EntityData>;

    /// Create the live entity when its handle is added to a world
    fn open(&self, handle: EntityHandle, data: EntityData) -> Player;
}

/// Configuration of regular players
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerConfig;

impl EntityConfig for PlayerConfig {
    fn bbox(&self, p: &Player) -> BBox {
        if p.swimming() || p.gliding() || p.crawling() {
            BBox::new(-0.3, 0.0, -0.3, 0.3, 0.6, 0.3)
        } else if p.sneaking() {
            BBox::new(-0.3, 0.0, -0.3, 0.3, 1.5, 0.3)
        } else {
            BBox::new(-0.3, 0.0, -0.3, 0.3, 1.8, 0.3)
        }
    }

    fn encode_entity(&self) -> &'static str {
        "minecraft:player"
    }

    fn network_offset(&self) -> f64 {
        1.621
    }

    fn encode_data(&self, p: &Player) -> Option<Vec<u8>> {
        match bincode::serialize(&p.entity_data()) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode player {}: {}", p.name(), e);
                None
            }
        }
    }

    fn decode_data(&self, data: &[u8]) -> Option<EntityData> {
        bincode::deserialize(data).ok()
    }

    fn open(&self, handle: EntityHandle, data: EntityData) -> Player {
        Player::new(handle, data)
    }
}
