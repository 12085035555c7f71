//! Connection bookkeeping

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Registry entry for one live charge point connection.
///
/// The `connection_id` is unique for the lifetime of the process, so two
/// connections sharing a charge point identifier (allowed by policy) can
/// still be unregistered individually.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub connection_id: u64,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    pub fn new() -> Self {
        Self {
            connection_id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            connected_at: Utc::now(),
        }
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionHandle::new();
        let b = ConnectionHandle::new();
        assert_ne!(a.connection_id, b.connection_id);
        assert!(a.connected_at <= Utc::now());
    }
}
