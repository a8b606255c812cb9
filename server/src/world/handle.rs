//! Stable references to entities that may move between worlds or be removed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use npc_shared::{Armour, ItemStack, Rotation, Skin, Vec3, DEFAULT_MAX_HEALTH};

use super::{Tx, World};
use crate::entities::{EntityConfig, Player};

/// Runtime entity ID, unique for the lifetime of the process
pub type EntityId = u64;

/// Source of unique entity IDs
static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Data an entity is opened from when it is added to a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub name: String,
    pub skin: Skin,
    pub position: Vec3,
    pub rotation: Rotation,
    pub scale: f64,
    pub health: f64,
    pub max_health: f64,
    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
    pub armour: Armour,
}

/// Options for spawning a new entity
#[derive(Debug, Clone, Default)]
pub struct EntitySpawnOpts {
    pub position: Vec3,
    pub rotation: Rotation,
    pub name: String,
    pub skin: Skin,
}

impl EntitySpawnOpts {
    /// Create a handle for a new entity. The entity exists once the handle is
    /// added to a world with [`Tx::add_entity`].
    pub fn spawn(self, config: impl EntityConfig + 'static) -> EntityHandle {
        let data = EntityData {
            name: self.name,
            skin: self.skin,
            position: self.position,
            rotation: self.rotation,
            scale: 1.0,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            main_hand: None,
            off_hand: None,
            armour: Armour::default(),
        };

        EntityHandle {
            inner: Arc::new(HandleInner {
                id: NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed),
                config: Arc::new(config),
                state: Mutex::new(HandleState::Pending(data)),
            }),
        }
    }
}

/// Where the entity behind a handle currently is
enum HandleState {
    /// Created but not yet added to a world
    Pending(EntityData),
    /// Owned by a world
    Active(World),
    /// Removed; the handle never resolves again
    Closed,
}

struct HandleInner {
    id: EntityId,
    config: Arc<dyn EntityConfig>,
    state: Mutex<HandleState>,
}

/// Reference to an entity. Cloning is cheap and every clone refers to the same
/// entity, wherever it currently lives.
#[derive(Clone)]
pub struct EntityHandle {
    inner: Arc<HandleInner>,
}

impl EntityHandle {
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    pub fn config(&self) -> &dyn EntityConfig {
        self.inner.config.as_ref()
    }

    /// The world the entity is in, or None if it was closed or never added
    pub fn world(&self) -> Option<World> {
        match &*self.lock() {
            HandleState::Active(world) => Some(world.clone()),
            HandleState::Pending(_) | HandleState::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), HandleState::Closed)
    }

    /// Run a closure against the entity inside a transaction of the world it is
    /// in. Follows the entity if it moves to another world before the closure
    /// runs. Returns None if the entity is closed or its world stopped.
    pub async fn exec_world<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Tx<'_>, &mut Player) -> R + Send + 'static,
        R: Send + 'static,
    {
        let id = self.id();
        let mut f = f;

        loop {
            let world = self.world()?;
            let attempt = world
                .exec(move |tx| match tx.checkout(id) {
                    Some(mut player) => {
                        let result = f(tx, &mut player);
                        tx.checkin(player);
                        Ok(result)
                    }
                    None => Err(f),
                })
                .await
                .ok()?;

            match attempt {
                Ok(result) => return Some(result),
                Err(returned) => {
                    // Only retry if the entity moved on in the meantime
                    if self.world().as_ref() == Some(&world) {
                        return None;
                    }
                    f = returned;
                }
            }
        }
    }

    /// Remove the entity from its world. Returns false if it was not in a world.
    pub async fn close(&self) -> bool {
        self.exec_world(|tx, p| p.close(tx)).await.is_some()
    }

    /// Move the entity to another world. Returns false if it was not in a world.
    pub async fn transfer(&self, dest: &World) -> bool {
        let dest = dest.clone();
        self.exec_world(move |_, p| p.transfer(&dest)).await.is_some()
    }

    pub(crate) fn take_pending(&self, world: &World) -> Option<EntityData> {
        let mut state = self.lock();
        if !matches!(*state, HandleState::Pending(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, HandleState::Active(world.clone())) {
            HandleState::Pending(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn mark_closed(&self) {
        *self.lock() = HandleState::Closed;
    }

    /// Point the handle at a new world and hand the entity to that world's
    /// queue. Runs under the handle lock so that no transaction resolved
    /// through the handle can reach the new world before the entity does.
    /// The entity is given back if the world is closed.
    pub(crate) fn repoint(&self, dest: &World, player: Player) -> Result<(), Player> {
        let mut state = self.lock();
        dest.insert(player)?;
        *state = HandleState::Active(dest.clone());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EntityHandle {}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle").field("id", &self.inner.id).finish()
    }
}
