//! World runtime.
//!
//! Every world is owned by a single background task. All reads and writes of a
//! world's entities and chunks happen inside transactions submitted to that
//! task's queue, so transactions on the same world never overlap.

mod chunks;
mod handle;
mod loader;
mod tx;

pub use handle::{EntityData, EntityHandle, EntityId, EntitySpawnOpts};
pub use loader::{Loader, LoaderId};
pub use tx::Tx;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use npc_shared::{ChunkPos, Vec3};

use crate::entities::Player;
use chunks::ChunkTickets;

/// Source of unique world IDs
static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// A transaction closure queued on a world
type TxFn = Box<dyn FnOnce(&mut Tx<'_>) + Send>;

/// Errors returned when talking to a world
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world {0} is closed")]
    Closed(String),
}

/// Definition of a world to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub name: String,
    /// Where actors respawn
    pub spawn: Vec3,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: "overworld".into(),
            spawn: Vec3::new(0.5, 64.0, 0.5),
        }
    }
}

/// Persisted data of an entity that was in a world when it closed
#[derive(Debug, Clone)]
pub struct SavedEntity {
    pub id: EntityId,
    pub name: String,
    pub data: Vec<u8>,
}

/// Commands consumed by the world task
enum WorldCommand {
    /// Run a transaction
    Exec(TxFn),
    /// Add an entity transferred from another world
    Insert(Player),
    /// Quit all entities and stop the task
    Close {
        response: oneshot::Sender<Vec<SavedEntity>>,
    },
}

/// State owned by the world task
#[derive(Default)]
pub(crate) struct WorldState {
    pub(crate) entities: HashMap<EntityId, Player>,
    pub(crate) chunks: ChunkTickets,
}

/// Handle to a running world. Cloning is cheap; two handles are equal if they
/// refer to the same world.
#[derive(Clone)]
pub struct World {
    inner: Arc<WorldInner>,
}

struct WorldInner {
    id: u32,
    name: String,
    spawn: Vec3,
    sender: mpsc::UnboundedSender<WorldCommand>,
}

impl World {
    /// Start a new world. Must be called from within a tokio runtime.
    ///
    /// The world runs until [`World::close`] is called.
    pub fn new(settings: WorldSettings) -> Self {
        // Unbounded: transactions submit to other worlds from synchronous code
        // and must never wait for queue capacity.
        let (sender, receiver) = mpsc::unbounded_channel();
        let world = Self {
            inner: Arc::new(WorldInner {
                id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
                name: settings.name,
                spawn: settings.spawn,
                sender,
            }),
        };

        tokio::spawn(world_task(world.clone(), receiver));
        info!("World {} ({}) started", world.name(), world.id());

        world
    }

    pub fn id(&self) -> u32 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Position actors respawn at
    pub fn spawn_position(&self) -> Vec3 {
        self.inner.spawn
    }

    /// Whether the world task has stopped accepting transactions
    pub fn is_closed(&self) -> bool {
        self.inner.sender.is_closed()
    }

    /// Run a transaction on the world and wait for its result
    pub async fn exec<R, F>(&self, f: F) -> Result<R, WorldError>
    where
        F: FnOnce(&mut Tx<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (response, rx) = oneshot::channel();
        self.submit(move |tx| {
            let _ = response.send(f(tx));
        })?;
        rx.await.map_err(|_| self.closed())
    }

    /// Queue a transaction without waiting for it (fire and forget).
    /// Safe to call from inside a transaction of any world.
    pub fn submit<F>(&self, f: F) -> Result<(), WorldError>
    where
        F: FnOnce(&mut Tx<'_>) + Send + 'static,
    {
        self.send(WorldCommand::Exec(Box::new(f)))
    }

    /// Quit every entity in the world and stop it. Returns the persisted data
    /// of entities whose configuration saves any.
    pub async fn close(&self) -> Result<Vec<SavedEntity>, WorldError> {
        let (response, rx) = oneshot::channel();
        self.send(WorldCommand::Close { response })?;
        rx.await.map_err(|_| self.closed())
    }

    /// Number of entities currently in the world
    pub async fn entity_count(&self) -> Result<usize, WorldError> {
        self.exec(|tx| tx.entity_count()).await
    }

    /// Number of chunks held loaded by any loader
    pub async fn loaded_chunks(&self) -> Result<usize, WorldError> {
        self.exec(|tx| tx.loaded_chunks()).await
    }

    /// Number of loaders keeping a chunk loaded
    pub async fn chunk_viewers(&self, pos: ChunkPos) -> Result<usize, WorldError> {
        self.exec(move |tx| tx.chunk_viewers(pos)).await
    }

    fn send(&self, cmd: WorldCommand) -> Result<(), WorldError> {
        self.inner.sender.send(cmd).map_err(|_| self.closed())
    }

    /// Hand an entity to the world's queue. The entity is given back if the
    /// world no longer accepts commands.
    pub(crate) fn insert(&self, player: Player) -> Result<(), Player> {
        match self.inner.sender.send(WorldCommand::Insert(player)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(WorldCommand::Insert(player))) => Err(player),
            Err(_) => unreachable!("only inserts are sent here"),
        }
    }

    fn closed(&self) -> WorldError {
        WorldError::Closed(self.inner.name.clone())
    }
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for World {}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Background task that owns a world's state and runs its transactions in order
async fn world_task(world: World, mut rx: mpsc::UnboundedReceiver<WorldCommand>) {
    let mut state = WorldState::default();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            WorldCommand::Exec(f) => {
                let mut tx = Tx::new(&world, &mut state);
                f(&mut tx);
            }

            WorldCommand::Insert(player) => {
                debug!("Entity {} entered world {}", player.id(), world.name());
                state.entities.insert(player.id(), player);
            }

            WorldCommand::Close { response } => {
                rx.close();
                drain_queue(&world, &mut state, &mut rx);
                let saved = close_entities(&world, &mut state);
                let _ = response.send(saved);
                break;
            }
        }
    }

    info!("World {} ({}) stopped", world.name(), world.id());
}

/// Run what was queued before the world stopped accepting commands. Entities
/// transferred in are kept so that they are quit with the rest.
fn drain_queue(world: &World, state: &mut WorldState, rx: &mut mpsc::UnboundedReceiver<WorldCommand>) {
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            WorldCommand::Exec(f) => {
                let mut tx = Tx::new(world, state);
                f(&mut tx);
            }
            WorldCommand::Insert(player) => {
                debug!("Entity {} entered closing world {}", player.id(), world.name());
                state.entities.insert(player.id(), player);
            }
            // Dropping the response reports the world as closed
            WorldCommand::Close { .. } => {}
        }
    }
}

/// Quit every entity still in the world, collecting persisted data first
fn close_entities(world: &World, state: &mut WorldState) -> Vec<SavedEntity> {
    let ids: Vec<EntityId> = state.entities.keys().copied().collect();
    let count = ids.len();
    let mut saved = Vec::new();
    let mut tx = Tx::new(world, state);

    for id in ids {
        let Some(mut player) = tx.checkout(id) else {
            continue;
        };
        if let Some(data) = player.handle().config().encode_data(&player) {
            saved.push(SavedEntity {
                id,
                name: player.name().to_string(),
                data,
            });
        }
        player.close(&mut tx);
        tx.checkin(player);
    }

    debug!("World {} closed {} entities, {} saved", world.name(), count, saved.len());
    saved
}
