//! Background task keeping an NPC's loader in the NPC's world.

use std::sync::{Arc, Mutex};

use log::debug;
use tokio::time::{self, MissedTickBehavior};

use npc_shared::sync_interval;

use super::lock;
use crate::world::{EntityHandle, Loader};

/// Periodically moves the loader to the world the NPC is in. The NPC may be
/// moved to another world by anything; the loader follows within one tick.
/// Stops once the NPC no longer resolves to a world.
pub(super) async fn sync_world(npc: EntityHandle, loader: Arc<Mutex<Loader>>) {
    let mut ticker = time::interval(sync_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let loader = Arc::clone(&loader);
        let synced = npc
            .exec_world(move |tx, _| {
                let mut loader = lock(&loader);
                if loader.world() != tx.world() {
                    let world = tx.world().clone();
                    loader.change_world(tx, world);
                }
            })
            .await;

        if synced.is_none() {
            debug!("NPC {} is no longer in a world, stopping world sync", npc.id());
            return;
        }
    }
}
