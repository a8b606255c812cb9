//! Actors and the handlers reacting to their events.

mod config;
mod handler;
mod player;

pub use config::{EntityConfig, PlayerConfig};
pub use handler::{
    Attacker, DamageSource, DeathOutcome, HurtEvent, HurtOutcome, NopHandler, Outcome, PlayerHandler,
};
pub use player::Player;
pub(crate) use player::Removal;
