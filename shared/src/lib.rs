pub mod math;
pub mod world;
pub mod items;
pub mod skin;

pub use math::*;
pub use world::*;
pub use items::*;
pub use skin::*;
