//! Spatial types shared between the runtime and its consumers.

use serde::{Deserialize, Serialize};

use crate::world::CHUNK_SIZE;

/// A position or offset in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the centre of the block this position lies in
    pub fn block_centre(&self) -> Self {
        Self {
            x: self.x.floor() + 0.5,
            y: self.y.floor() + 0.5,
            z: self.z.floor() + 0.5,
        }
    }

    /// Returns the chunk column containing this position
    pub fn chunk(&self) -> ChunkPos {
        let size = CHUNK_SIZE as f64;
        ChunkPos::new((self.x / size).floor() as i32, (self.z / size).floor() as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3 { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3 { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Yaw and pitch in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
}

impl Rotation {
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Adds a delta, wrapping yaw into (-180, 180] and clamping pitch to [-90, 90]
    pub fn rotated(&self, dyaw: f64, dpitch: f64) -> Self {
        let mut yaw = (self.yaw + dyaw) % 360.0;
        if yaw > 180.0 {
            yaw -= 360.0;
        } else if yaw <= -180.0 {
            yaw += 360.0;
        }
        Self {
            yaw,
            pitch: (self.pitch + dpitch).clamp(-90.0, 90.0),
        }
    }
}

/// Axis-aligned bounding box relative to an entity's feet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    pub const fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        Self {
            min: Vec3::new(min_x, min_y, min_z),
            max: Vec3::new(max_x, max_y, max_z),
        }
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Scales the box around the feet position
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            min: Vec3::new(self.min.x * scale, self.min.y * scale, self.min.z * scale),
            max: Vec3::new(self.max.x * scale, self.max.y * scale, self.max.z * scale),
        }
    }
}

/// Horizontal chunk column coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn distance_squared(&self, other: ChunkPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    /// Every chunk within `radius` chunks of this one (circular area)
    pub fn within_radius(&self, radius: i32) -> Vec<ChunkPos> {
        let r2 = (radius as i64) * (radius as i64);
        let mut chunks = Vec::new();
        for x in -radius..=radius {
            for z in -radius..=radius {
                let pos = ChunkPos::new(self.x + x, self.z + z);
                if self.distance_squared(pos) <= r2 {
                    chunks.push(pos);
                }
            }
        }
        chunks
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_centre() {
        let pos = Vec3::new(10.2, 64.0, -3.7).block_centre();
        assert_eq!(pos, Vec3::new(10.5, 64.5, -3.5));
    }

    #[test]
    fn test_chunk_of_negative_position() {
        assert_eq!(Vec3::new(-0.1, 0.0, 15.9).chunk(), ChunkPos::new(-1, 0));
        assert_eq!(Vec3::new(16.0, 0.0, -16.0).chunk(), ChunkPos::new(1, -1));
    }

    #[test]
    fn test_rotation_wraps() {
        let rot = Rotation::new(170.0, 80.0).rotated(20.0, 20.0);
        assert!((rot.yaw - -170.0).abs() < 0.001);
        assert_eq!(rot.pitch, 90.0);
    }

    #[test]
    fn test_within_radius() {
        let centre = ChunkPos::new(0, 0);
        let chunks = centre.within_radius(1);
        // Circle of radius 1 is the centre plus its four neighbours
        assert_eq!(chunks.len(), 5);
        assert!(chunks.contains(&centre));
        assert!(!chunks.contains(&ChunkPos::new(1, 1)));
    }
}
