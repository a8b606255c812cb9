//! Renderable skin descriptor.

use serde::{Deserialize, Serialize};

/// Selects which geometry of a skin model is used
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Identifier of the default geometry, e.g. "geometry.humanoid.custom"
    pub default: String,
    /// Identifier of the animated face geometry, if any
    pub animated_face: String,
}

/// Texture and geometry of a player-like actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skin {
    width: u32,
    height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major
    pub pix: Vec<u8>,
    /// Raw geometry JSON
    pub model: Vec<u8>,
    pub model_config: ModelConfig,
}

impl Skin {
    /// Creates a fully transparent skin of the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pix: vec![0; (width * height * 4) as usize],
            model: Vec::new(),
            model_config: ModelConfig::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
