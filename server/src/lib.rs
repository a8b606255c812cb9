//! NPC server
//!
//! Worlds run as background tasks serialising every change to their entities.
//! NPCs are spawned into them as players without a connection.

pub mod config;
pub mod entities;
pub mod npc;
pub mod world;
