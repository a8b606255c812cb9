//! Chunk ticket bookkeeping.
//!
//! A chunk stays loaded for as long as at least one loader holds a ticket on it.

use std::collections::{HashMap, HashSet};

use npc_shared::ChunkPos;

use super::loader::LoaderId;

/// Loaded chunks of a single world and the loaders keeping them loaded
#[derive(Debug, Default)]
pub(crate) struct ChunkTickets {
    viewers: HashMap<ChunkPos, HashSet<LoaderId>>,
}

impl ChunkTickets {
    /// Adds a ticket. Returns true if the chunk was not loaded before.
    pub fn acquire(&mut self, pos: ChunkPos, loader: LoaderId) -> bool {
        let viewers = self.viewers.entry(pos).or_default();
        let newly_loaded = viewers.is_empty();
        viewers.insert(loader);
        newly_loaded
    }

    /// Removes a ticket. Returns true if the chunk got unloaded.
    pub fn release(&mut self, pos: ChunkPos, loader: LoaderId) -> bool {
        let Some(viewers) = self.viewers.get_mut(&pos) else {
            return false;
        };
        viewers.remove(&loader);
        if viewers.is_empty() {
            self.viewers.remove(&pos);
            return true;
        }
        false
    }

    /// Removes every ticket held by a loader, returning how many were held
    pub fn release_all(&mut self, loader: LoaderId) -> usize {
        let mut released = 0;
        self.viewers.retain(|_, viewers| {
            if viewers.remove(&loader) {
                released += 1;
            }
            !viewers.is_empty()
        });
        released
    }

    pub fn viewers(&self, pos: ChunkPos) -> usize {
        self.viewers.get(&pos).map_or(0, HashSet::len)
    }

    pub fn held_by(&self, loader: LoaderId) -> usize {
        self.viewers.values().filter(|v| v.contains(&loader)).count()
    }

    pub fn loaded(&self) -> usize {
        self.viewers.len()
    }
}
