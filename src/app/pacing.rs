//! Paced waits with progress reporting
//!
//! Long sleeps between requests are the normal operating mode of this tool,
//! so they log their remaining time instead of going silent. Retry cooldowns
//! add a random jitter so repeated failures do not line up into synchronized
//! retry storms.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

/// Sleep for `total`, logging the remaining time every `progress_interval`.
///
/// A final short sleep covers any remainder smaller than the interval.
///
/// # Panics
///
/// Panics when `total` is zero or `progress_interval` is zero or longer than
/// `total` - both are caller bugs, not runtime conditions.
pub async fn wait_with_progress(total: Duration, progress_interval: Duration) {
    assert!(!total.is_zero(), "wait duration must be positive");
    assert!(
        !progress_interval.is_zero() && progress_interval <= total,
        "progress interval must be positive and no longer than the wait itself"
    );

    info!("Waiting for {:.1}s", total.as_secs_f64());

    let mut remaining = total;
    while remaining >= progress_interval {
        tokio::time::sleep(progress_interval).await;
        remaining = remaining.saturating_sub(progress_interval);

        if remaining >= Duration::from_millis(1) {
            info!(
                "Waiting for {:.1}s, {:.1}s left",
                total.as_secs_f64(),
                remaining.as_secs_f64()
            );
        }
    }

    if !remaining.is_zero() {
        tokio::time::sleep(remaining).await;
    }

    debug!("Waited for {:.1}s", total.as_secs_f64());
}

/// A random duration in `[base, base + spread)`
pub fn jittered(base: Duration, spread: Duration) -> Duration {
    if spread.is_zero() {
        return base;
    }
    base + spread.mul_f64(rand::thread_rng().gen::<f64>())
}
