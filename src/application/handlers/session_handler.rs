//! Per-connection OCPP 2.0.1 session handler
//!
//! Parses raw OCPP-J frames, dispatches Calls to the action handlers and
//! serializes the CallResult. One instance exists per connection, owned by
//! the connection's receive loop; handler invocations are strictly
//! sequential, so no locking is needed around the session state.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::handlers::action_matcher;
use crate::application::validation::{ChargerIdentityValidator, TokenValidator};
use crate::domain::SessionState;
use crate::support::ocpp_frame::OcppFrame;

/// Handler and state for one charge point connection.
pub struct SessionHandler {
    pub charge_point_id: String,
    pub state: SessionState,
    pub charger_validator: Arc<ChargerIdentityValidator>,
    pub token_validator: Arc<TokenValidator>,
    /// Heartbeat interval (seconds) announced on accepted boots.
    pub heartbeat_interval: i32,
}

impl SessionHandler {
    pub fn new(
        charge_point_id: impl Into<String>,
        charger_validator: Arc<ChargerIdentityValidator>,
        token_validator: Arc<TokenValidator>,
        heartbeat_interval: i32,
    ) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            state: SessionState::new(),
            charger_validator,
            token_validator,
            heartbeat_interval,
        }
    }

    /// Process one inbound message, returning the serialized response frame
    /// if one must be sent.
    ///
    /// After a rejected boot the session is terminal: anything the station
    /// still sends before the forced close lands is ignored here, so the
    /// outcome does not depend on transport timing.
    pub fn handle(&mut self, text: &str) -> Option<String> {
        if self.state.is_terminal() {
            warn!(
                charge_point_id = self.charge_point_id.as_str(),
                "Ignoring message received after boot rejection"
            );
            return None;
        }

        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(
                    charge_point_id = self.charge_point_id.as_str(),
                    error = %e,
                    raw = text,
                    "Failed to parse OCPP message"
                );
                return None;
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                info!(
                    charge_point_id = self.charge_point_id.as_str(),
                    action = action.as_str(),
                    "Received Call"
                );

                let response_payload = action_matcher(self, &action, &payload);

                Some(
                    OcppFrame::CallResult {
                        unique_id,
                        payload: response_payload,
                    }
                    .serialize(),
                )
            }

            // The central system originates no Calls, so results and errors
            // have nothing to correlate with.
            OcppFrame::CallResult { unique_id, .. } => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    message_id = unique_id.as_str(),
                    "Received CallResult with no pending call"
                );
                None
            }

            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
            } => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    message_id = unique_id.as_str(),
                    error_code = error_code.as_str(),
                    error_description = error_description.as_str(),
                    "Received CallError"
                );
                None
            }
        }
    }

    /// Whether the connection must be closed once pending responses are
    /// flushed. Set by a rejected boot; checked by the receive loop after
    /// every handled message.
    pub fn must_disconnect(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validation::ChargerIdentityValidator;
    use crate::config::{ChargerAllowEntry, TokenAllowEntry};
    use rust_ocpp::v2_0_1::enumerations::id_token_enum_type::IdTokenEnumType;

    fn make_session() -> SessionHandler {
        let charger_validator = ChargerIdentityValidator::from_entries(&[ChargerAllowEntry {
            vendor_name: "EurecomCharge".to_string(),
            model: "E2507".to_string(),
            serial_number_regex: "E2507-[0-9]{4}-[0-9]{4}".to_string(),
        }])
        .unwrap();
        let token_validator = TokenValidator::new(vec![TokenAllowEntry {
            kind: IdTokenEnumType::ISO14443,
            value: "AABBCCDD".to_string(),
        }]);
        SessionHandler::new(
            "E2507-8420-1274",
            Arc::new(charger_validator),
            Arc::new(token_validator),
            10,
        )
    }

    fn boot_frame(serial: &str) -> String {
        format!(
            r#"[2,"m1","BootNotification",{{"chargingStation":{{"vendorName":"EurecomCharge","model":"E2507","serialNumber":"{}"}},"reason":"PowerUp"}}]"#,
            serial
        )
    }

    #[test]
    fn call_is_answered_with_call_result() {
        let mut session = make_session();
        let response = session.handle(r#"[2,"42","Heartbeat",{}]"#).unwrap();
        match OcppFrame::parse(&response).unwrap() {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "42");
                assert!(payload["currentTime"].is_string());
            }
            other => panic!("Expected CallResult, got {:?}", other),
        }
    }

    #[test]
    fn accepted_boot_does_not_disconnect() {
        let mut session = make_session();
        let response = session.handle(&boot_frame("E2507-8420-1274")).unwrap();
        assert!(response.contains(r#""status":"Accepted""#));
        assert!(!session.must_disconnect());
    }

    #[test]
    fn rejected_boot_answers_then_goes_silent() {
        let mut session = make_session();

        let response = session.handle(&boot_frame("UNLISTED-1")).unwrap();
        assert!(response.contains(r#""status":"Rejected""#));
        assert!(session.must_disconnect());

        // Terminal state: nothing after the rejection is processed,
        // not even a heartbeat.
        assert!(session.handle(r#"[2,"43","Heartbeat",{}]"#).is_none());
    }

    #[test]
    fn unknown_action_still_gets_a_call_result() {
        let mut session = make_session();
        let response = session.handle(r#"[2,"7","MeterValues",{}]"#).unwrap();
        assert_eq!(response, r#"[3,"7",{}]"#);
    }

    #[test]
    fn unparseable_text_yields_no_response() {
        let mut session = make_session();
        assert!(session.handle("garbage").is_none());
        assert!(session.handle(r#"[5,"id",{}]"#).is_none());
    }

    #[test]
    fn call_results_and_errors_are_dropped() {
        let mut session = make_session();
        assert!(session.handle(r#"[3,"m9",{}]"#).is_none());
        assert!(session
            .handle(r#"[4,"m9","GenericError","boom",{}]"#)
            .is_none());
    }
}
