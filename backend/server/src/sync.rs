//! # Resync
//!
//! Background task that retries remote writes the Counter Service could not
//! complete. The in-process count is authoritative, so the task only ever
//! pushes the cached value; it never reads counts back from the table.
use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::state::AppState;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub fn spawn_resync(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.resync_interval.max(MIN_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let pending = state.counters.pending().len();
            if pending == 0 {
                debug!("Nothing to resync");
                continue;
            }

            let flushed = state.counters.flush_pending().await;
            info!("Resync pass: {flushed}/{pending} pending counters written");
        }
    })
}
