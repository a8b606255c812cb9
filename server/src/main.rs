//! NPC Server
//!
//! Starts the configured worlds, spawns their NPCs and runs until interrupted.

use std::collections::HashMap;
use std::sync::Arc;

use log::{error, info, warn};

use npc_server::config::ServerConfig;
use npc_server::entities::Player;
use npc_server::npc::{self, HandlerFunc};
use npc_server::world::{EntityHandle, World};
use npc_shared::SYNC_TICK_RATE;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting NPC Server...");
    info!("World sync rate: {} Hz", SYNC_TICK_RATE);

    let config = ServerConfig::from_env();

    let worlds: HashMap<String, World> = config
        .worlds
        .iter()
        .map(|settings| (settings.name.clone(), World::new(settings.clone())))
        .collect();

    // Log every attack on an NPC
    let on_attack: HandlerFunc = Arc::new(|npc: &mut Player, attacker: &Player| {
        info!("{} attacked NPC {}", attacker.name(), npc.name());
    });

    let mut npcs: Vec<EntityHandle> = Vec::new();
    for spawn in &config.npcs {
        let Some(world) = worlds.get(&spawn.world) else {
            warn!("NPC {} is placed in unknown world {}, skipping", spawn.name, spawn.world);
            continue;
        };
        let settings = match spawn.settings() {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load skin of NPC {}: {}", spawn.name, e);
                continue;
            }
        };
        npcs.push(npc::create(settings, world, Some(Arc::clone(&on_attack))).await);
    }

    info!("Server started with {} worlds and {} NPCs", worlds.len(), npcs.len());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down...");
    for (name, world) in worlds {
        match world.close().await {
            Ok(saved) => info!("Closed world {}, {} entities saved", name, saved.len()),
            Err(e) => error!("Failed to close world {}: {}", name, e),
        }
    }
}
