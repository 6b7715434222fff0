use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::SharedState;

/// Periodically drop expired rate-limit windows until shutdown is signaled.
pub fn spawn_limiter_sweeper(
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.rate_limit.window_secs.max(1));

    tokio::spawn(async move {
        tracing::debug!("Rate limiter sweeper started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    let before = state.limiter.len();
                    state.limiter.cleanup();
                    let dropped = before.saturating_sub(state.limiter.len());
                    if dropped > 0 {
                        tracing::debug!("Swept {dropped} expired rate limit windows");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Rate limiter sweeper stopped");
    })
}
