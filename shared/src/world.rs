//! World-level constants shared by the runtime and NPC controller.

use std::time::Duration;

/// How often NPC synchronisation tasks run, in Hz
pub const SYNC_TICK_RATE: u32 = 20;

/// Radius, in chunks, kept loaded around every NPC
pub const LOADER_RADIUS: i32 = 8;

/// Width of a chunk column in blocks
pub const CHUNK_SIZE: i32 = 16;

/// Invulnerability window requested after an NPC is hit
pub const NPC_HURT_IMMUNITY: Duration = Duration::from_millis(410);

/// Invulnerability window applied to regular players after a hit
pub const DEFAULT_HURT_IMMUNITY: Duration = Duration::from_millis(500);

/// Health a freshly spawned or respawned actor has
pub const DEFAULT_MAX_HEALTH: f64 = 20.0;

/// Interval between two NPC synchronisation ticks
pub fn sync_interval() -> Duration {
    Duration::from_secs(1) / SYNC_TICK_RATE
}
