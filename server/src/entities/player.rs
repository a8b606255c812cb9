//! Player-like actor living in a world.

use std::sync::Arc;

use log::debug;
use tokio::time::Instant;

use npc_shared::{Armour, BBox, ItemStack, Rotation, Skin, Vec3, DEFAULT_HURT_IMMUNITY};

use super::handler::{DamageSource, HurtEvent, NopHandler, PlayerHandler};
use crate::world::{EntityData, EntityHandle, EntityId, Tx, World};

/// Removal requested by a player during a transaction, applied when the
/// transaction hands the player back to its world
#[derive(Debug, Clone)]
pub(crate) enum Removal {
    Close,
    Transfer(World),
}

/// A player-like actor
pub struct Player {
    handle: EntityHandle,
    name: String,
    skin: Skin,
    position: Vec3,
    rotation: Rotation,
    scale: f64,
    main_hand: Option<ItemStack>,
    off_hand: Option<ItemStack>,
    armour: Armour,
    immobile: bool,
    sneaking: bool,
    swimming: bool,
    gliding: bool,
    crawling: bool,
    health: f64,
    max_health: f64,
    dead: bool,
    immune_until: Option<Instant>,
    handler: Arc<dyn PlayerHandler>,
    removal: Option<Removal>,
}

impl Player {
    pub(crate) fn new(handle: EntityHandle, data: EntityData) -> Self {
        Self {
            handle,
            name: data.name,
            skin: data.skin,
            position: data.position,
            rotation: data.rotation,
            scale: data.scale,
            main_hand: data.main_hand,
            off_hand: data.off_hand,
            armour: data.armour,
            immobile: false,
            sneaking: false,
            swimming: false,
            gliding: false,
            crawling: false,
            health: data.health,
            max_health: data.max_health,
            dead: false,
            immune_until: None,
            handler: Arc::new(NopHandler),
            removal: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.handle.id()
    }

    pub fn handle(&self) -> &EntityHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn skin(&self) -> &Skin {
        &self.skin
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Set the rotation without notifying the handler
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn held_items(&self) -> (Option<&ItemStack>, Option<&ItemStack>) {
        (self.main_hand.as_ref(), self.off_hand.as_ref())
    }

    pub fn set_held_items(&mut self, main_hand: Option<ItemStack>, off_hand: Option<ItemStack>) {
        self.main_hand = main_hand;
        self.off_hand = off_hand;
    }

    pub fn armour(&self) -> &Armour {
        &self.armour
    }

    pub fn armour_mut(&mut self) -> &mut Armour {
        &mut self.armour
    }

    pub fn immobile(&self) -> bool {
        self.immobile
    }

    /// Prevent the player from changing position through movement
    pub fn set_immobile(&mut self) {
        self.immobile = true;
    }

    pub fn set_mobile(&mut self) {
        self.immobile = false;
    }

    pub fn sneaking(&self) -> bool {
        self.sneaking
    }

    pub fn set_sneaking(&mut self, sneaking: bool) {
        self.sneaking = sneaking;
    }

    pub fn swimming(&self) -> bool {
        self.swimming
    }

    pub fn set_swimming(&mut self, swimming: bool) {
        self.swimming = swimming;
    }

    pub fn gliding(&self) -> bool {
        self.gliding
    }

    pub fn set_gliding(&mut self, gliding: bool) {
        self.gliding = gliding;
    }

    pub fn crawling(&self) -> bool {
        self.crawling
    }

    pub fn set_crawling(&mut self, crawling: bool) {
        self.crawling = crawling;
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn max_health(&self) -> f64 {
        self.max_health
    }

    pub fn dead(&self) -> bool {
        self.dead
    }

    /// Bounding box as defined by the entity configuration, scaled
    pub fn bbox(&self) -> BBox {
        self.handle.config().bbox(self).scaled(self.scale)
    }

    /// Attach a handler, replacing the current one
    pub fn set_handler(&mut self, handler: Arc<dyn PlayerHandler>) {
        self.handler = handler;
    }

    /// Snapshot of the data the player could be reopened from
    pub fn entity_data(&self) -> EntityData {
        EntityData {
            name: self.name.clone(),
            skin: self.skin.clone(),
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            health: self.health,
            max_health: self.max_health,
            main_hand: self.main_hand.clone(),
            off_hand: self.off_hand.clone(),
            armour: self.armour.clone(),
        }
    }

    /// Move by a delta and rotate. Immobile players only rotate.
    pub fn move_by(&mut self, tx: &mut Tx<'_>, delta: Vec3, dyaw: f64, dpitch: f64) {
        if self.dead {
            return;
        }
        let delta = if self.immobile { Vec3::ZERO } else { delta };
        if delta.is_zero() && dyaw == 0.0 && dpitch == 0.0 {
            return;
        }

        let pos = self.position + delta;
        let rot = self.rotation.rotated(dyaw, dpitch);
        let handler = Arc::clone(&self.handler);
        if handler.handle_move(tx, self, pos, rot).is_suppressed() {
            return;
        }
        self.position = pos;
        self.rotation = rot;
    }

    /// Teleport to a position. Returns false if the handler cancelled it.
    pub fn teleport(&mut self, tx: &mut Tx<'_>, pos: Vec3) -> bool {
        let handler = Arc::clone(&self.handler);
        if handler.handle_teleport(tx, self, pos).is_suppressed() {
            return false;
        }
        self.position = pos;
        true
    }

    /// Deal damage. Returns the damage dealt and whether the player was
    /// vulnerable to it.
    pub fn hurt(&mut self, tx: &mut Tx<'_>, damage: f64, src: DamageSource) -> (f64, bool) {
        if self.dead || damage < 0.0 {
            return (0.0, false);
        }
        let now = Instant::now();
        if self.immune_until.is_some_and(|until| now < until) {
            return (0.0, false);
        }

        let event = HurtEvent {
            damage,
            immunity: DEFAULT_HURT_IMMUNITY,
            source: src,
        };
        let handler = Arc::clone(&self.handler);
        let outcome = handler.handle_hurt(tx, self, &event);
        if outcome.suppressed {
            return (0.0, false);
        }

        let dealt = outcome.damage.max(0.0);
        self.immune_until = Some(now + outcome.immunity);
        self.health = (self.health - dealt).max(0.0);
        if self.health <= 0.0 {
            self.kill(tx, &event.source);
        }
        (dealt, true)
    }

    /// Whether the player is within an invulnerability window
    pub fn immune(&self) -> bool {
        self.immune_until.is_some_and(|until| Instant::now() < until)
    }

    /// Kill the player, notifying the handler. Held items and armour are lost
    /// unless the handler keeps them.
    pub fn kill(&mut self, tx: &mut Tx<'_>, src: &DamageSource) {
        if self.dead {
            return;
        }
        self.health = 0.0;
        self.dead = true;

        let handler = Arc::clone(&self.handler);
        let outcome = handler.handle_death(tx, self, src);
        if !outcome.keep_inventory {
            self.main_hand = None;
            self.off_hand = None;
            let dropped = self.armour.clear();
            debug!("Player {} died and dropped {} armour pieces", self.name, dropped.len());
        }
        if outcome.respawn {
            self.respawn(tx);
        }
    }

    /// Bring a dead player back at the world spawn
    pub fn respawn(&mut self, tx: &mut Tx<'_>) {
        if !self.dead {
            return;
        }
        self.dead = false;
        self.health = self.max_health;
        self.immune_until = None;

        let spawn = tx.world().spawn_position();
        self.teleport(tx, spawn);
    }

    /// Remove the player from its world once the transaction ends. The handler
    /// is notified the first time only.
    pub fn close(&mut self, tx: &mut Tx<'_>) {
        if matches!(self.removal, Some(Removal::Close)) {
            return;
        }
        let handler = Arc::clone(&self.handler);
        handler.handle_quit(tx, self);
        self.removal = Some(Removal::Close);
    }

    /// Move the player to another world once the transaction ends
    pub fn transfer(&mut self, dest: &World) {
        if matches!(self.removal, Some(Removal::Close)) {
            return;
        }
        self.removal = Some(Removal::Transfer(dest.clone()));
    }

    pub(crate) fn take_removal(&mut self) -> Option<Removal> {
        self.removal.take()
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("position", &self.position)
            .field("health", &self.health)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PlayerConfig;
    use crate::world::{EntitySpawnOpts, WorldSettings};
    use std::time::Duration;

    async fn spawn_player(world: &World) -> EntityHandle {
        let handle = EntitySpawnOpts {
            position: Vec3::new(0.5, 64.0, 0.5),
            name: "Steve".into(),
            ..Default::default()
        }
        .spawn(PlayerConfig);
        let h = handle.clone();
        world.exec(move |tx| tx.add_entity(&h)).await.unwrap();
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn test_hurt_applies_damage_and_immunity() {
        let world = World::new(WorldSettings::default());
        let handle = spawn_player(&world).await;

        let (first, second) = handle
            .exec_world(|tx, p| {
                let first = p.hurt(tx, 5.0, DamageSource::Fall);
                let second = p.hurt(tx, 5.0, DamageSource::Fall);
                (first, second)
            })
            .await
            .unwrap();

        assert_eq!(first, (5.0, true));
        // Second hit lands inside the immunity window
        assert_eq!(second, (0.0, false));

        tokio::time::advance(DEFAULT_HURT_IMMUNITY + Duration::from_millis(1)).await;
        let (health, hit) = handle
            .exec_world(|tx, p| {
                let hit = p.hurt(tx, 5.0, DamageSource::Void);
                (p.health(), hit)
            })
            .await
            .unwrap();
        assert_eq!(hit, (5.0, true));
        assert_eq!(health, 10.0);
    }

    #[tokio::test]
    async fn test_death_without_handler_drops_items() {
        let world = World::new(WorldSettings::default());
        let handle = spawn_player(&world).await;

        let (dead, held, armour_empty) = handle
            .exec_world(|tx, p| {
                p.set_held_items(Some(ItemStack::new("minecraft:stick", 1)), None);
                p.armour_mut().set(Some(ItemStack::new("minecraft:iron_helmet", 1)), None, None, None);
                p.hurt(tx, 100.0, DamageSource::Void);
                (p.dead(), p.held_items().0.cloned(), p.armour().is_empty())
            })
            .await
            .unwrap();

        assert!(dead);
        assert!(held.is_none());
        assert!(armour_empty);
    }

    #[tokio::test]
    async fn test_immobile_player_only_rotates() {
        let world = World::new(WorldSettings::default());
        let handle = spawn_player(&world).await;

        let (pos, rot) = handle
            .exec_world(|tx, p| {
                p.set_immobile();
                p.move_by(tx, Vec3::new(3.0, 0.0, 0.0), 90.0, 0.0);
                (p.position(), p.rotation())
            })
            .await
            .unwrap();

        assert_eq!(pos, Vec3::new(0.5, 64.0, 0.5));
        assert_eq!(rot.yaw, 90.0);
    }

    #[tokio::test]
    async fn test_quit_notifies_once() {
        struct CountQuits(std::sync::atomic::AtomicUsize);
        impl PlayerHandler for CountQuits {
            fn handle_quit(&self, _: &mut Tx<'_>, _: &mut Player) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let world = World::new(WorldSettings::default());
        let handle = spawn_player(&world).await;
        let counter = Arc::new(CountQuits(Default::default()));

        let h = Arc::clone(&counter);
        handle
            .exec_world(move |tx, p| {
                p.set_handler(h);
                p.close(tx);
                p.close(tx);
            })
            .await
            .unwrap();
        assert!(!handle.close().await);

        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(world.entity_count().await.unwrap(), 0);
    }
}
