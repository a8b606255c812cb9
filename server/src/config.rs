//! Server configuration.
//!
//! Read from a JSON file named by the `NPC_SERVER_CONFIG` environment variable.
//! Without a usable file the server starts with built-in defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use npc_shared::{ItemStack, Vec3};

use crate::npc::skin::{self, SkinError, DEFAULT_MODEL};
use crate::npc::Settings;
use crate::world::WorldSettings;

/// Environment variable holding the path of the configuration file
pub const CONFIG_ENV: &str = "NPC_SERVER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no worlds configured")]
    NoWorlds,

    #[error("world {0} is configured twice")]
    DuplicateWorld(String),

    #[error("npc {npc} is placed in unknown world {world}")]
    UnknownWorld { npc: String, world: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub worlds: Vec<WorldSettings>,
    pub npcs: Vec<NpcSpawn>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// An NPC spawned at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcSpawn {
    /// Name of the world to spawn in
    pub world: String,
    pub name: String,
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    pub scale: f64,
    pub immobile: bool,
    pub vulnerable: bool,

    /// Skin texture image. The default skin is used when absent.
    pub texture: Option<PathBuf>,
    /// Geometry for `texture`, defaulting to the standard humanoid model
    pub model: Option<PathBuf>,

    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
    pub helmet: Option<ItemStack>,
    pub chestplate: Option<ItemStack>,
    pub leggings: Option<ItemStack>,
    pub boots: Option<ItemStack>,
}

impl Default for NpcSpawn {
    fn default() -> Self {
        Self {
            world: WorldSettings::default().name,
            name: "NPC".into(),
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            scale: 1.0,
            immobile: false,
            vulnerable: false,
            texture: None,
            model: None,
            main_hand: None,
            off_hand: None,
            helmet: None,
            chestplate: None,
            leggings: None,
            boots: None,
        }
    }
}

impl NpcSpawn {
    /// Build creation settings, reading the skin files if any are configured
    pub fn settings(&self) -> Result<Settings, SkinError> {
        let skin = match &self.texture {
            Some(texture) => {
                let texture = skin::parse_texture(texture)?;
                match &self.model {
                    Some(model) => skin::skin(&texture, &skin::parse_model(model)?)?,
                    None => skin::skin(&texture, &DEFAULT_MODEL)?,
                }
            }
            None => skin::default_skin(),
        };

        Ok(Settings {
            name: self.name.clone(),
            skin,
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
            scale: self.scale,
            main_hand: self.main_hand.clone(),
            off_hand: self.off_hand.clone(),
            helmet: self.helmet.clone(),
            chestplate: self.chestplate.clone(),
            leggings: self.leggings.clone(),
            boots: self.boots.clone(),
            immobile: self.immobile,
            vulnerable: self.vulnerable,
        })
    }
}

impl ServerConfig {
    /// One world with a single guide NPC next to its spawn
    pub fn with_defaults() -> Self {
        let world = WorldSettings::default();
        let guide = NpcSpawn {
            world: world.name.clone(),
            name: "Guide".into(),
            position: world.spawn + Vec3::new(3.0, 0.0, 3.0),
            yaw: 180.0,
            immobile: true,
            main_hand: Some(ItemStack::new("minecraft:book", 1)),
            ..Default::default()
        };

        Self {
            worlds: vec![world],
            npcs: vec![guide],
        }
    }

    /// Read and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig = serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file named by [`CONFIG_ENV`], falling back to defaults
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_or_default(path.as_deref())
    }

    /// Load a configuration file, falling back to defaults if there is no
    /// path or the file can't be used
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No config file given, using defaults");
            return Self::with_defaults();
        };

        match Self::load(path) {
            Ok(config) => {
                info!(
                    "Loaded config from {}: {} worlds, {} npcs",
                    path.display(),
                    config.worlds.len(),
                    config.npcs.len()
                );
                config
            }
            Err(e) => {
                error!("{}", e);
                error!("Using default config");
                Self::with_defaults()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worlds.is_empty() {
            return Err(ConfigError::NoWorlds);
        }

        let mut names = HashSet::new();
        for world in &self.worlds {
            if !names.insert(world.name.as_str()) {
                return Err(ConfigError::DuplicateWorld(world.name.clone()));
            }
        }

        for npc in &self.npcs {
            if !names.contains(npc.world.as_str()) {
                return Err(ConfigError::UnknownWorld {
                    npc: npc.name.clone(),
                    world: npc.world.clone(),
                });
            }
        }
        Ok(())
    }
}
