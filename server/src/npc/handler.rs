//! Handler attached to every NPC.

use std::sync::{Arc, Mutex};

use log::debug;

use npc_shared::{Rotation, Vec3, LOADER_RADIUS, NPC_HURT_IMMUNITY};

use super::{lock, HandlerFunc};
use crate::entities::{DamageSource, DeathOutcome, HurtEvent, HurtOutcome, Outcome, Player, PlayerHandler};
use crate::world::{Loader, Tx};

/// Runs the NPC's [`HandlerFunc`] when a player attacks it and keeps its
/// [`Loader`] positioned on the NPC.
pub(super) struct NpcHandler {
    loader: Arc<Mutex<Loader>>,
    f: HandlerFunc,
    vulnerable: bool,
}

impl NpcHandler {
    pub(super) fn new(loader: Arc<Mutex<Loader>>, f: HandlerFunc, vulnerable: bool) -> Self {
        Self { loader, f, vulnerable }
    }

    /// Centre the loader on `pos` and load the chunks closest to it
    pub(super) fn sync_position(&self, tx: &mut Tx<'_>, pos: Vec3) {
        let mut loader = lock(&self.loader);
        loader.move_to(tx, pos);
        loader.load(tx, LOADER_RADIUS as usize);
    }
}

impl PlayerHandler for NpcHandler {
    fn handle_move(&self, tx: &mut Tx<'_>, _p: &mut Player, pos: Vec3, _rot: Rotation) -> Outcome {
        self.sync_position(tx, pos);
        Outcome::Proceed
    }

    fn handle_teleport(&self, tx: &mut Tx<'_>, _p: &mut Player, pos: Vec3) -> Outcome {
        self.sync_position(tx, pos);
        Outcome::Proceed
    }

    fn handle_hurt(&self, tx: &mut Tx<'_>, p: &mut Player, hurt: &HurtEvent) -> HurtOutcome {
        let mut outcome = hurt.proceed();

        if let Some(id) = hurt.source.attacking_player() {
            outcome.damage = 0.0;
            match tx.player(id) {
                Some(attacker) => (self.f)(p, attacker),
                // Left, moved to another world, or is this NPC
                None => debug!("NPC {} attacked by player {} who is not in world {}", p.id(), id, tx.world().name()),
            }
        }

        outcome.immunity = NPC_HURT_IMMUNITY;
        if !self.vulnerable {
            outcome.suppressed = true;
        }
        outcome
    }

    fn handle_death(&self, _tx: &mut Tx<'_>, _p: &mut Player, _src: &DamageSource) -> DeathOutcome {
        DeathOutcome {
            keep_inventory: true,
            respawn: true,
        }
    }

    fn handle_quit(&self, tx: &mut Tx<'_>, _p: &mut Player) {
        lock(&self.loader).close(tx);
    }
}
