//! Item stacks and armour sets held by actors.

use serde::{Deserialize, Serialize};

/// A stack of a single item type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Namespaced item identifier, e.g. "minecraft:diamond_sword"
    pub item: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self { item: item.into(), count }
    }
}

/// Armour worn by an actor, one optional stack per slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armour {
    pub helmet: Option<ItemStack>,
    pub chestplate: Option<ItemStack>,
    pub leggings: Option<ItemStack>,
    pub boots: Option<ItemStack>,
}

impl Armour {
    pub fn set(
        &mut self,
        helmet: Option<ItemStack>,
        chestplate: Option<ItemStack>,
        leggings: Option<ItemStack>,
        boots: Option<ItemStack>,
    ) {
        self.helmet = helmet;
        self.chestplate = chestplate;
        self.leggings = leggings;
        self.boots = boots;
    }

    /// Removes all armour, returning the stacks that were worn
    pub fn clear(&mut self) -> Vec<ItemStack> {
        [
            self.helmet.take(),
            self.chestplate.take(),
            self.leggings.take(),
            self.boots.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.helmet.is_none() && self.chestplate.is_none() && self.leggings.is_none() && self.boots.is_none()
    }
}
