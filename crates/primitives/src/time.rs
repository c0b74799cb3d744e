use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}
