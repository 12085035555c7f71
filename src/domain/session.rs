//! Per-connection session state
//!
//! Every WebSocket connection owns exactly one `SessionState`. It is created
//! when the connection is established, mutated only by that connection's
//! message handlers, and dropped on disconnect. Nothing here is shared
//! between connections.

use rust_ocpp::v2_0_1::enumerations::charging_state_enum_type::ChargingStateEnumType;
use rust_ocpp::v2_0_1::enumerations::connector_status_enum_type::ConnectorStatusEnumType;

use super::identity::ChargePointIdentity;

/// Lifecycle phase of a charge point session.
///
/// `BootRejected` is terminal: once entered, no further inbound message for
/// this session is processed, regardless of what the transport still
/// delivers before the forced close takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, no accepted BootNotification yet.
    Connecting,
    /// BootNotification validated against the charger allow-list.
    BootAccepted,
    /// BootNotification refused; the connection is being torn down.
    BootRejected,
}

/// Mutable state of one charge point connection.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Identity captured from the accepted BootNotification.
    pub identity: Option<ChargePointIdentity>,
    pub phase: SessionPhase,
    /// Set only via an Accepted classification on the `Authorized`
    /// transaction event trigger.
    pub is_authorized: bool,
    /// Single-connector model: one status for the whole station.
    pub connector_status: ConnectorStatusEnumType,
    pub charging_state: ChargingStateEnumType,
    /// Last transaction id reported by the station.
    pub transaction_id: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            identity: None,
            phase: SessionPhase::Connecting,
            is_authorized: false,
            connector_status: ConnectorStatusEnumType::Available,
            charging_state: ChargingStateEnumType::Idle,
            transaction_id: None,
        }
    }

    /// Record an accepted boot and capture the announced identity.
    pub fn boot_accepted(&mut self, identity: ChargePointIdentity) {
        self.phase = SessionPhase::BootAccepted;
        self.identity = Some(identity);
    }

    /// Record a refused boot. The session is dead from this point on.
    pub fn boot_rejected(&mut self) {
        self.phase = SessionPhase::BootRejected;
    }

    /// Whether the session has reached a state where inbound messages must
    /// no longer be processed.
    pub fn is_terminal(&self) -> bool {
        self.phase == SessionPhase::BootRejected
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_idle_and_unbooted() {
        let state = SessionState::new();
        assert_eq!(state.phase, SessionPhase::Connecting);
        assert!(!state.is_authorized);
        assert!(state.identity.is_none());
        assert!(state.transaction_id.is_none());
        assert_eq!(state.connector_status, ConnectorStatusEnumType::Available);
        assert_eq!(state.charging_state, ChargingStateEnumType::Idle);
        assert!(!state.is_terminal());
    }

    #[test]
    fn boot_accepted_captures_identity() {
        let mut state = SessionState::new();
        state.boot_accepted(ChargePointIdentity::new("SN123", "Acme", "X1"));
        assert_eq!(state.phase, SessionPhase::BootAccepted);
        assert_eq!(
            state.identity,
            Some(ChargePointIdentity::new("SN123", "Acme", "X1"))
        );
        assert!(!state.is_terminal());
    }

    #[test]
    fn boot_rejected_is_terminal() {
        let mut state = SessionState::new();
        state.boot_rejected();
        assert!(state.is_terminal());
    }
}
