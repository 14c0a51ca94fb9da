//! Store connection with fixed-interval retry.

use std::thread;

use qp_forecast::{ForecastError, TimeSeriesStore};
use tracing::{info, warn};

use crate::config::ConnectionConfig;

/// Connect `store`, retrying every `retry_interval` until it succeeds or
/// `max_attempts` is reached. Returns the number of attempts made.
pub fn connect_with_backoff(
    store: &dyn TimeSeriesStore,
    config: &ConnectionConfig,
) -> qp_forecast::Result<u32> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match store.connect() {
            Ok(()) => {
                info!(attempt, "connected to time-series store");
                return Ok(attempt);
            }
            Err(e) => {
                if config.max_attempts.is_some_and(|max| attempt >= max) {
                    warn!(attempt, error = %e, "giving up on time-series store");
                    return Err(match e {
                        ForecastError::StoreUnavailable(_) => e,
                        other => ForecastError::StoreUnavailable(other.to_string()),
                    });
                }
                warn!(
                    attempt,
                    error = %e,
                    retry_in_secs = config.retry_interval_secs,
                    "failed to connect to time-series store, retrying"
                );
                thread::sleep(config.retry_interval());
            }
        }
    }
}
