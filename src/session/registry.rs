//! Connection registry - admission ledger for charge point sessions
//!
//! The only state shared between connections. `register` is the admission
//! decision: when the policy forbids multiple serial numbers, a second
//! connection with an already-live identifier is refused and must be torn
//! down by the caller without any protocol exchange.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};

use super::connection::ConnectionHandle;

/// Admission refusal. Logged by the caller; never surfaced to the peer.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("A session for charge point {0} is already registered")]
    DuplicateIdentity(String),
}

/// Thread-safe registry of live charge point connections.
pub struct ConnectionRegistry {
    allow_multiple_serial_numbers: bool,
    sessions: DashMap<String, Vec<ConnectionHandle>>,
}

/// Shared, reference-counted connection registry
pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

impl ConnectionRegistry {
    pub fn new(allow_multiple_serial_numbers: bool) -> Self {
        Self {
            allow_multiple_serial_numbers,
            sessions: DashMap::new(),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared(allow_multiple_serial_numbers: bool) -> SharedConnectionRegistry {
        Arc::new(Self::new(allow_multiple_serial_numbers))
    }

    /// Admit a new connection.
    ///
    /// The duplicate check and the insert happen under the same map entry
    /// lock: two connects racing with the same identifier cannot both be
    /// admitted when duplicates are disallowed.
    pub fn register(
        &self,
        charge_point_id: &str,
        handle: ConnectionHandle,
    ) -> Result<(), AdmissionError> {
        match self.sessions.entry(charge_point_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !self.allow_multiple_serial_numbers && !entry.get().is_empty() {
                    warn!(
                        charge_point_id,
                        existing_connected_at = %entry.get()[0].connected_at,
                        "Refusing duplicate charge point session"
                    );
                    return Err(AdmissionError::DuplicateIdentity(
                        charge_point_id.to_string(),
                    ));
                }
                info!(
                    charge_point_id,
                    connection_id = handle.connection_id,
                    "Registered additional charge point session"
                );
                entry.get_mut().push(handle);
            }
            Entry::Vacant(entry) => {
                info!(
                    charge_point_id,
                    connection_id = handle.connection_id,
                    "Registered charge point session"
                );
                entry.insert(vec![handle]);
            }
        }
        Ok(())
    }

    /// Remove the entry created by the matching `register`. Idempotent:
    /// unregistering an unknown pair is a no-op, and runs on every
    /// connection teardown path.
    pub fn unregister(&self, charge_point_id: &str, connection_id: u64) {
        if let Entry::Occupied(mut entry) = self.sessions.entry(charge_point_id.to_string()) {
            let handles = entry.get_mut();
            let before = handles.len();
            handles.retain(|handle| handle.connection_id != connection_id);
            if handles.len() < before {
                info!(
                    charge_point_id,
                    connection_id, "Unregistered charge point session"
                );
            }
            if handles.is_empty() {
                entry.remove();
            }
        }
    }

    /// Whether at least one session is live for this identifier.
    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.sessions
            .get(charge_point_id)
            .map(|handles| !handles.is_empty())
            .unwrap_or(false)
    }

    /// All identifiers with at least one live session.
    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of live connections (not identifiers).
    pub fn count(&self) -> usize {
        self.sessions.iter().map(|r| r.value().len()).sum()
    }
}
