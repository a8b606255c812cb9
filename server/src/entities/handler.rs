//! Notifications delivered to the handler attached to a player.

use std::time::Duration;

use npc_shared::{Rotation, Vec3};

use crate::entities::Player;
use crate::world::{EntityId, Tx};

/// Whether an event goes ahead after its handler ran
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Proceed,
    Suppressed,
}

impl Outcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Outcome::Suppressed)
    }
}

/// Who dealt an attack
#[derive(Debug, Clone, PartialEq)]
pub enum Attacker {
    /// A player-like actor in the same world
    Player(EntityId),
    /// Any other creature, identified by its type
    Mob(String),
}

/// Cause of damage
#[derive(Debug, Clone, PartialEq)]
pub enum DamageSource {
    /// Melee attack
    Attack { attacker: Attacker },
    Fall,
    Void,
    Custom(String),
}

impl DamageSource {
    /// The attacking player, if this damage is a player's attack
    pub fn attacking_player(&self) -> Option<EntityId> {
        match self {
            DamageSource::Attack { attacker: Attacker::Player(id) } => Some(*id),
            _ => None,
        }
    }
}

/// A pending hurt, as delivered to [`PlayerHandler::handle_hurt`]
#[derive(Debug, Clone, PartialEq)]
pub struct HurtEvent {
    pub damage: f64,
    /// Invulnerability window that starts if the hurt goes ahead
    pub immunity: Duration,
    pub source: DamageSource,
}

impl HurtEvent {
    /// Outcome that lets the hurt go ahead unchanged
    pub fn proceed(&self) -> HurtOutcome {
        HurtOutcome {
            damage: self.damage,
            immunity: self.immunity,
            suppressed: false,
        }
    }
}

/// Result of handling a hurt: corrected values plus an explicit veto
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HurtOutcome {
    pub damage: f64,
    pub immunity: Duration,
    /// No damage, no immunity, no death
    pub suppressed: bool,
}

/// Result of handling a death
#[must_use]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeathOutcome {
    /// Keep held items and armour instead of dropping them
    pub keep_inventory: bool,
    /// Respawn right away
    pub respawn: bool,
}

/// Reacts to events of a player. Every method defaults to doing nothing and
/// letting the event proceed.
///
/// Handlers run synchronously inside the transaction of the player's world and
/// must not block.
#[allow(unused_variables)]
pub trait PlayerHandler: Send + Sync {
    /// The player is about to move to `pos`
    fn handle_move(&self, tx: &mut Tx<'_>, p: &mut Player, pos: Vec3, rot: Rotation) -> Outcome {
        Outcome::Proceed
    }

    /// The player is about to be teleported to `pos`
    fn handle_teleport(&self, tx: &mut Tx<'_>, p: &mut Player, pos: Vec3) -> Outcome {
        Outcome::Proceed
    }

    fn handle_hurt(&self, tx: &mut Tx<'_>, p: &mut Player, hurt: &HurtEvent) -> HurtOutcome {
        hurt.proceed()
    }

    /// The player's health dropped to zero
    fn handle_death(&self, tx: &mut Tx<'_>, p: &mut Player, src: &DamageSource) -> DeathOutcome {
        DeathOutcome::default()
    }

    /// The player is being removed from its world. Called once.
    fn handle_quit(&self, tx: &mut Tx<'_>, p: &mut Player) {}
}

/// Handler that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NopHandler;

impl PlayerHandler for NopHandler {}
