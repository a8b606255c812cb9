//! Chunk loaders.
//!
//! A loader keeps the chunks within a radius around a position loaded in the
//! world it is bound to. Chunks are loaded nearest first, a limited number per
//! call to [`Loader::load`]. A loader must be closed when no longer needed or
//! the chunks it holds stay loaded.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use npc_shared::{ChunkPos, Vec3};

use super::{Tx, World};

/// Unique ID of a loader, used as its chunk ticket
pub type LoaderId = u64;

static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

/// Keeps a radius of chunks loaded around a position in one world
#[derive(Debug)]
pub struct Loader {
    id: LoaderId,
    radius: i32,
    world: World,
    pos: Vec3,
    centre: ChunkPos,
    loaded: HashSet<ChunkPos>,
    /// Chunks still to load, farthest first so that popping yields the nearest
    queue: Vec<ChunkPos>,
    closed: bool,
}

impl Loader {
    /// Create a loader bound to a world, centred on the origin
    pub fn new(radius: i32, world: &World) -> Self {
        let mut loader = Self {
            id: NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed),
            radius: radius.max(0),
            world: world.clone(),
            pos: Vec3::ZERO,
            centre: Vec3::ZERO.chunk(),
            loaded: HashSet::new(),
            queue: Vec::new(),
            closed: false,
        };
        loader.populate_queue();
        loader
    }

    pub fn id(&self) -> LoaderId {
        self.id
    }

    /// The world the loader is currently bound to
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Number of chunks this loader holds loaded
    pub fn loaded_chunks(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.loaded.contains(&pos)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Move the loader to a new position. Chunks that fall outside the radius
    /// are released; chunks newly inside it are queued for loading.
    pub fn move_to(&mut self, tx: &mut Tx<'_>, pos: Vec3) {
        if self.closed {
            return;
        }
        self.pos = pos;

        let centre = pos.chunk();
        if centre == self.centre {
            return;
        }
        self.centre = centre;

        let r2 = (self.radius as i64) * (self.radius as i64);
        let evicted: Vec<ChunkPos> = self
            .loaded
            .iter()
            .filter(|c| c.distance_squared(centre) > r2)
            .copied()
            .collect();
        for chunk in &evicted {
            self.loaded.remove(chunk);
        }
        self.release(tx, evicted);
        self.populate_queue();
    }

    /// Load up to `n` queued chunks, nearest first. Returns how many were
    /// loaded. Nothing is loaded from a transaction of another world.
    pub fn load(&mut self, tx: &mut Tx<'_>, n: usize) -> usize {
        if self.closed {
            return 0;
        }
        if tx.world() != &self.world {
            debug!(
                "Loader {} is bound to world {}, not loading from a transaction of {}",
                self.id,
                self.world.name(),
                tx.world().name()
            );
            return 0;
        }

        let mut count = 0;
        while count < n {
            let Some(chunk) = self.queue.pop() else {
                break;
            };
            if self.loaded.insert(chunk) {
                tx.acquire_chunk(chunk, self.id);
                count += 1;
            }
        }
        count
    }

    /// Bind the loader to another world. Every chunk held in the old world is
    /// released and the area around the current position is queued again.
    pub fn change_world(&mut self, tx: &mut Tx<'_>, new: World) {
        if self.closed || new == self.world {
            return;
        }

        let held: Vec<ChunkPos> = self.loaded.drain().collect();
        self.release(tx, held);

        debug!("Loader {} moved from world {} to {}", self.id, self.world.name(), new.name());
        self.world = new;
        self.populate_queue();
    }

    /// Release every chunk held. Returns false if the loader was already closed.
    pub fn close(&mut self, tx: &mut Tx<'_>) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.loaded.clear();
        self.queue.clear();

        let id = self.id;
        if tx.world() == &self.world {
            tx.release_all_chunks(id);
        } else if let Err(e) = self.world.submit(move |tx| {
            tx.release_all_chunks(id);
        }) {
            warn!("Loader {} could not release chunks: {}", id, e);
        }
        true
    }

    /// Release chunk tickets in the bound world. If the transaction belongs to
    /// another world the release is queued on the bound world instead.
    fn release(&self, tx: &mut Tx<'_>, chunks: Vec<ChunkPos>) {
        if chunks.is_empty() {
            return;
        }

        let id = self.id;
        if tx.world() == &self.world {
            for chunk in chunks {
                tx.release_chunk(chunk, id);
            }
            return;
        }

        let queued = self.world.submit(move |tx| {
            for chunk in chunks {
                tx.release_chunk(chunk, id);
            }
        });
        if let Err(e) = queued {
            // A closed world holds no chunks any more
            warn!("Loader {} could not release chunks: {}", id, e);
        }
    }

    fn populate_queue(&mut self) {
        let centre = self.centre;
        let mut queue: Vec<ChunkPos> = centre
            .within_radius(self.radius)
            .into_iter()
            .filter(|c| !self.loaded.contains(c))
            .collect();
        queue.sort_by_key(|c| std::cmp::Reverse(c.distance_squared(centre)));
        self.queue = queue;
    }
}
