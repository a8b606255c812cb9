//! Server-controlled NPCs.
//!
//! An NPC is a player without a connection. It lives in a world like any other
//! player and is removed the same way, by closing its handle. A [`Loader`]
//! follows every NPC around so the chunks it stands in stay loaded, even when
//! the NPC is moved to another world.

mod config;
mod handler;
pub mod skin;
mod sync;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use tokio::task::JoinHandle;

use npc_shared::{ItemStack, Rotation, Skin, Vec3, LOADER_RADIUS};

use crate::entities::Player;
use crate::world::{EntityHandle, EntitySpawnOpts, Loader, World};
use config::NpcConfig;
use handler::NpcHandler;

/// Called when a player attacks an NPC, with the NPC and the attacker
pub type HandlerFunc = Arc<dyn Fn(&mut Player, &Player) + Send + Sync>;

/// Appearance and behaviour of an NPC
#[derive(Debug, Clone)]
pub struct Settings {
    pub name: String,
    pub skin: Skin,
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    /// Size multiplier. Values of zero or less are treated as 1.
    pub scale: f64,

    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
    pub helmet: Option<ItemStack>,
    pub chestplate: Option<ItemStack>,
    pub leggings: Option<ItemStack>,
    pub boots: Option<ItemStack>,

    /// Prevent the NPC from moving
    pub immobile: bool,
    /// Let hurts go ahead instead of cancelling them
    pub vulnerable: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "NPC".into(),
            skin: skin::default_skin(),
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            scale: 1.0,
            main_hand: None,
            off_hand: None,
            helmet: None,
            chestplate: None,
            leggings: None,
            boots: None,
            immobile: false,
            vulnerable: false,
        }
    }
}

/// A spawned NPC together with the state kept alongside it
pub struct Spawned {
    pub handle: EntityHandle,
    pub loader: Arc<Mutex<Loader>>,
    /// The world synchronisation task; finishes once the NPC is closed
    pub sync: JoinHandle<()>,
}

/// Create an NPC in a world and return its handle. A [`Loader`] follows the
/// NPC in the background to keep the chunks around it loaded.
///
/// `f` is called when a player attacks the NPC; None ignores attacks.
/// The NPC is removed like any other player, with [`EntityHandle::close`].
///
/// # Panics
///
/// Panics if the world is closed.
pub async fn create(settings: Settings, world: &World, f: Option<HandlerFunc>) -> EntityHandle {
    spawn(settings, world, f).await.handle
}

/// Like [`create`], also returning the NPC's loader and synchronisation task
pub async fn spawn(settings: Settings, world: &World, f: Option<HandlerFunc>) -> Spawned {
    let Settings {
        name,
        skin,
        position,
        yaw,
        pitch,
        mut scale,
        main_hand,
        off_hand,
        helmet,
        chestplate,
        leggings,
        boots,
        immobile,
        vulnerable,
    } = settings;

    let f = f.unwrap_or_else(|| Arc::new(|_: &mut Player, _: &Player| {}));
    if !(scale > 0.0) {
        scale = 1.0;
    }

    let position = position.block_centre();
    let rotation = Rotation::new(yaw, pitch);
    let handle = EntitySpawnOpts {
        position,
        rotation,
        name: name.clone(),
        skin,
    }
    .spawn(NpcConfig::default());

    let h = handle.clone();
    if world.exec(move |tx| tx.add_entity(&h)).await.is_err() {
        panic!("world passed to npc::create must not be closed");
    }

    let loader = Arc::new(Mutex::new(Loader::new(LOADER_RADIUS, world)));
    let handler = Arc::new(NpcHandler::new(Arc::clone(&loader), f, vulnerable));

    let h = Arc::clone(&handler);
    let configured = handle
        .exec_world(move |_, p| {
            p.set_rotation(rotation);
            p.set_scale(scale);
            p.set_held_items(main_hand, off_hand);
            p.armour_mut().set(helmet, chestplate, leggings, boots);
            if immobile {
                p.set_immobile();
            }
            p.set_handler(h);
        })
        .await;
    if configured.is_none() {
        panic!("npc {} is not in a world", name);
    }

    let h = Arc::clone(&handler);
    if world.exec(move |tx| h.sync_position(tx, position)).await.is_err() {
        panic!("world passed to npc::create must not be closed");
    }
    let sync = tokio::spawn(sync::sync_world(handle.clone(), Arc::clone(&loader)));

    info!("Spawned NPC {} ({}) in world {} at {}", name, handle.id(), world.name(), position);

    Spawned { handle, loader, sync }
}

/// Lock a mutex that is only ever held inside a world transaction
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Attacker, DamageSource, PlayerConfig};
    use crate::world::WorldSettings;
    use npc_shared::sync_interval;
    use std::time::Duration;

    fn world(name: &str) -> World {
        World::new(WorldSettings { name: name.into(), ..Default::default() })
    }

    #[tokio::test]
    async fn test_create_binds_loader_to_npc_world() {
        let w = world("spawn");
        let settings = Settings {
            name: "Guide".into(),
            position: Vec3::new(10.2, 64.0, -5.7),
            yaw: 90.0,
            pitch: 10.0,
            main_hand: Some(ItemStack::new("minecraft:book", 1)),
            helmet: Some(ItemStack::new("minecraft:golden_helmet", 1)),
            immobile: true,
            ..Default::default()
        };
        let npc = spawn(settings, &w, None).await;

        assert_eq!(npc.handle.world(), Some(w.clone()));
        {
            let loader = lock(&npc.loader);
            assert_eq!(loader.world(), &w);
            assert_eq!(loader.position(), Vec3::new(10.5, 64.5, -5.5));
            assert_eq!(loader.loaded_chunks(), LOADER_RADIUS as usize);
        }

        let (pos, rot, main_hand, helmet, immobile) = npc
            .handle
            .exec_world(|_, p| {
                (
                    p.position(),
                    p.rotation(),
                    p.held_items().0.cloned(),
                    p.armour().helmet.clone(),
                    p.immobile(),
                )
            })
            .await
            .unwrap();
        assert_eq!(pos, Vec3::new(10.5, 64.5, -5.5));
        assert_eq!(rot, Rotation::new(90.0, 10.0));
        assert_eq!(main_hand, Some(ItemStack::new("minecraft:book", 1)));
        assert_eq!(helmet, Some(ItemStack::new("minecraft:golden_helmet", 1)));
        assert!(immobile);
        assert_eq!(w.loaded_chunks().await.unwrap(), LOADER_RADIUS as usize);
    }

    #[tokio::test]
    async fn test_scale_is_normalised() {
        let w = world("scale");

        for (requested, expected) in [(-3.0, 1.0), (0.0, 1.0), (f64::NAN, 1.0), (0.5, 0.5), (2.5, 2.5)] {
            let settings = Settings { scale: requested, ..Default::default() };
            let handle = create(settings, &w, None).await;
            let scale = handle.exec_world(|_, p| p.scale()).await.unwrap();
            assert_eq!(scale, expected, "scale {} should become {}", requested, expected);
        }
    }

    #[tokio::test]
    #[should_panic(expected = "must not be closed")]
    async fn test_create_in_closed_world_panics() {
        let w = world("closed");
        w.close().await.unwrap();
        create(Settings::default(), &w, None).await;
    }

    #[tokio::test]
    async fn test_attack_runs_callback() {
        let w = world("attack");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&hits);
        let f: HandlerFunc = Arc::new(move |npc: &mut Player, attacker: &Player| {
            recorded.lock().unwrap().push((npc.id(), attacker.id()));
        });

        let npc = create(Settings::default(), &w, Some(f)).await;
        let attacker = EntitySpawnOpts { name: "Steve".into(), ..Default::default() }.spawn(PlayerConfig);
        let a = attacker.clone();
        w.exec(move |tx| tx.add_entity(&a)).await.unwrap();

        let src = DamageSource::Attack { attacker: Attacker::Player(attacker.id()) };
        let (dealt, health) = npc.exec_world(move |tx, p| (p.hurt(tx, 8.0, src), p.health())).await.unwrap();

        assert_eq!(dealt, (0.0, false));
        assert_eq!(health, 20.0);
        assert_eq!(*hits.lock().unwrap(), vec![(npc.id(), attacker.id())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_follows_npc_to_other_world() {
        let a = world("a");
        let b = world("b");
        let npc = spawn(Settings::default(), &a, None).await;

        assert!(npc.handle.transfer(&b).await);
        assert_eq!(lock(&npc.loader).world(), &a);

        tokio::time::sleep(sync_interval() + Duration::from_millis(1)).await;
        assert_eq!(lock(&npc.loader).world(), &b);
        assert_eq!(a.loaded_chunks().await.unwrap(), 0);

        // The next movement loads chunks in the new world
        npc.handle
            .exec_world(|tx, p| p.teleport(tx, Vec3::new(64.0, 80.0, 64.0)))
            .await
            .unwrap();
        assert_eq!(b.loaded_chunks().await.unwrap(), LOADER_RADIUS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_stops_after_close() {
        let w = world("close");
        let npc = spawn(Settings::default(), &w, None).await;

        tokio::time::sleep(sync_interval() * 3).await;
        assert!(!npc.sync.is_finished());

        assert!(npc.handle.close().await);
        assert!(lock(&npc.loader).is_closed());
        assert_eq!(w.loaded_chunks().await.unwrap(), 0);
        assert_eq!(w.entity_count().await.unwrap(), 0);

        let stopped = tokio::time::timeout(sync_interval() * 2, npc.sync).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_after_transfer_releases_old_world() {
        let a = world("a");
        let b = world("b");
        let npc = spawn(Settings::default(), &a, None).await;

        // Closed before the sync task noticed the transfer
        assert!(npc.handle.transfer(&b).await);
        assert!(npc.handle.close().await);

        assert_eq!(a.loaded_chunks().await.unwrap(), 0);
        assert_eq!(b.loaded_chunks().await.unwrap(), 0);
        assert!(npc.handle.world().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_into_closing_world_never_loses_npc() {
        let a = world("a");
        let b = world("b");
        let npc = spawn(Settings::default(), &a, None).await;

        let (moved, closed) = tokio::join!(npc.handle.transfer(&b), b.close());
        assert!(moved);
        assert!(closed.is_ok());

        match npc.handle.world() {
            // The transfer lost the race and the NPC stayed behind
            Some(w) => {
                assert_eq!(w, a);
                assert!(!lock(&npc.loader).is_closed());
                assert_eq!(a.entity_count().await.unwrap(), 1);
            }
            // The NPC reached b and was quit along with it
            None => {
                assert!(npc.handle.is_closed());
                assert!(lock(&npc.loader).is_closed());
                assert_eq!(a.loaded_chunks().await.unwrap(), 0);
                assert_eq!(a.entity_count().await.unwrap(), 0);

                let stopped = tokio::time::timeout(sync_interval() * 2, npc.sync).await;
                assert!(matches!(stopped, Ok(Ok(()))));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_world_close_quits_npc() {
        let w = world("shutdown");
        let npc = spawn(Settings::default(), &w, None).await;
        let player = EntitySpawnOpts { name: "Steve".into(), ..Default::default() }.spawn(PlayerConfig);
        let p = player.clone();
        w.exec(move |tx| tx.add_entity(&p)).await.unwrap();

        let saved = w.close().await.unwrap();

        // NPCs are never persisted
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, player.id());
        assert!(lock(&npc.loader).is_closed());

        let stopped = tokio::time::timeout(sync_interval() * 2, npc.sync).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_npc_config_delegates_to_player() {
        use crate::entities::EntityConfig;

        let w = world("config");
        let handle = create(Settings::default(), &w, None).await;

        let (network_id, offset, height, encoded) = handle
            .exec_world(|_, p| {
                let config = p.handle().config();
                (config.encode_entity(), config.network_offset(), p.bbox().height(), config.encode_data(p))
            })
            .await
            .unwrap();

        assert_eq!(network_id, PlayerConfig.encode_entity());
        assert_eq!(offset, 1.621);
        assert!((height - 1.8).abs() < 1e-9);
        assert!(encoded.is_none());
    }
}
