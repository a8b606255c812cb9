//! Transaction context handed to closures running on a world.

use log::{debug, warn};

use npc_shared::ChunkPos;

use super::handle::EntityId;
use super::loader::LoaderId;
use super::{World, WorldState};
use crate::entities::{Player, Removal};

/// Exclusive access to a world's state for the duration of one transaction.
///
/// While a closure runs against a specific entity, that entity is checked out
/// of the world and passed separately; every other entity stays reachable here.
pub struct Tx<'a> {
    world: &'a World,
    state: &'a mut WorldState,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(world: &'a World, state: &'a mut WorldState) -> Self {
        Self { world, state }
    }

    /// The world this transaction runs on
    pub fn world(&self) -> &World {
        self.world
    }

    /// Add a pending entity to the world. Returns false if the handle was
    /// already added to a world or closed.
    pub fn add_entity(&mut self, handle: &super::EntityHandle) -> bool {
        let Some(data) = handle.take_pending(self.world) else {
            return false;
        };
        let player = handle.config().open(handle.clone(), data);
        debug!("Entity {} ({}) added to world {}", player.id(), player.name(), self.world.name());
        self.state.entities.insert(player.id(), player);
        true
    }

    /// Look up a player in this world
    pub fn player(&self, id: EntityId) -> Option<&Player> {
        self.state.entities.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.state.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.state.entities.len()
    }

    pub fn loaded_chunks(&self) -> usize {
        self.state.chunks.loaded()
    }

    pub fn chunk_viewers(&self, pos: ChunkPos) -> usize {
        self.state.chunks.viewers(pos)
    }

    /// Number of chunks a loader holds loaded in this world
    pub fn chunks_held_by(&self, loader: LoaderId) -> usize {
        self.state.chunks.held_by(loader)
    }

    pub(crate) fn acquire_chunk(&mut self, pos: ChunkPos, loader: LoaderId) -> bool {
        self.state.chunks.acquire(pos, loader)
    }

    pub(crate) fn release_chunk(&mut self, pos: ChunkPos, loader: LoaderId) -> bool {
        self.state.chunks.release(pos, loader)
    }

    pub(crate) fn release_all_chunks(&mut self, loader: LoaderId) -> usize {
        self.state.chunks.release_all(loader)
    }

    /// Take an entity out of the world for the duration of a closure.
    /// Must be paired with [`Tx::checkin`].
    pub(crate) fn checkout(&mut self, id: EntityId) -> Option<Player> {
        self.state.entities.remove(&id)
    }

    /// Return a checked out entity, applying any removal it requested
    pub(crate) fn checkin(&mut self, mut player: Player) {
        match player.take_removal() {
            None => {
                self.state.entities.insert(player.id(), player);
            }

            Some(Removal::Close) => {
                debug!("Entity {} ({}) removed from world {}", player.id(), player.name(), self.world.name());
                player.handle().mark_closed();
            }

            Some(Removal::Transfer(dest)) if dest == *self.world => {
                self.state.entities.insert(player.id(), player);
            }

            Some(Removal::Transfer(dest)) => {
                let handle = player.handle().clone();
                debug!("Entity {} moving from world {} to {}", player.id(), self.world.name(), dest.name());
                if let Err(player) = handle.repoint(&dest, player) {
                    warn!(
                        "Entity {} cannot move to closed world {}, staying in {}",
                        player.id(),
                        dest.name(),
                        self.world.name()
                    );
                    self.state.entities.insert(player.id(), player);
                }
            }
        }
    }
}
