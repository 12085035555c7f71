//! TransactionEvent handler
//!
//! The transaction lifecycle branches on `trigger_reason`, not on
//! `event_type`: the station reports why the event fired (authorization,
//! cable plugged in, charging state change) and the central system answers
//! each trigger with a short personal message for the display.

use rust_ocpp::v2_0_1::datatypes::id_token_info_type::IdTokenInfoType;
use rust_ocpp::v2_0_1::datatypes::id_token_type::IdTokenType;
use rust_ocpp::v2_0_1::datatypes::message_content_type::MessageContentType;
use rust_ocpp::v2_0_1::enumerations::authorization_status_enum_type::AuthorizationStatusEnumType;
use rust_ocpp::v2_0_1::enumerations::charging_state_enum_type::ChargingStateEnumType;
use rust_ocpp::v2_0_1::enumerations::message_format_enum_type::MessageFormatEnumType;
use rust_ocpp::v2_0_1::enumerations::trigger_reason_enum_type::TriggerReasonEnumType;
use rust_ocpp::v2_0_1::messages::transaction_event::{
    TransactionEventRequest, TransactionEventResponse,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::application::handlers::SessionHandler;

pub fn handle_transaction_event(session: &mut SessionHandler, payload: &Value) -> Value {
    let req: TransactionEventRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                charge_point_id = session.charge_point_id.as_str(),
                error = %e,
                "Failed to deserialize TransactionEventRequest"
            );
            return serde_json::json!({});
        }
    };

    info!(
        charge_point_id = session.charge_point_id.as_str(),
        event_type = ?req.event_type,
        trigger_reason = ?req.trigger_reason,
        transaction_id = req.transaction_info.transaction_id.as_str(),
        "TransactionEvent"
    );

    session.state.transaction_id = Some(req.transaction_info.transaction_id.clone());

    match req.trigger_reason {
        TriggerReasonEnumType::Authorized => handle_authorized(session, req.id_token.as_ref()),

        TriggerReasonEnumType::CablePluggedIn => {
            // Intentionally not gated on session authorization.
            info!(
                charge_point_id = session.charge_point_id.as_str(),
                "Cable plugged in"
            );
            build_response(None, Some("Cable is plugged in"))
        }

        TriggerReasonEnumType::ChargingStateChanged => {
            handle_charging_state_changed(session, req.transaction_info.charging_state)
        }

        _ => build_response(None, Some("Not implemented")),
    }
}

/// The only path that can flip `is_authorized`: the token is re-validated
/// and anything but `Accepted` is echoed back without touching the session.
fn handle_authorized(session: &mut SessionHandler, id_token: Option<&IdTokenType>) -> Value {
    let status = match id_token {
        Some(token) => session.token_validator.validate(token),
        None => {
            warn!(
                charge_point_id = session.charge_point_id.as_str(),
                "Authorized trigger without an idToken"
            );
            AuthorizationStatusEnumType::Unknown
        }
    };

    if !matches!(status, AuthorizationStatusEnumType::Accepted) {
        warn!(
            charge_point_id = session.charge_point_id.as_str(),
            status = ?status,
            "Charging authorization refused"
        );
        return build_response(Some(status), None);
    }

    session.state.is_authorized = true;
    info!(
        charge_point_id = session.charge_point_id.as_str(),
        "Charging authorized"
    );

    build_response(
        Some(AuthorizationStatusEnumType::Accepted),
        Some("Charging is Authorized"),
    )
}

fn handle_charging_state_changed(
    session: &mut SessionHandler,
    charging_state: Option<ChargingStateEnumType>,
) -> Value {
    let message = match charging_state {
        Some(state) => {
            let message = match state {
                ChargingStateEnumType::Charging => "Charging started",
                ChargingStateEnumType::SuspendedEV | ChargingStateEnumType::SuspendedEVSE => {
                    "Charging suspended"
                }
                ChargingStateEnumType::Idle => "Charging stopped",
                _ => "Unknown",
            };
            info!(
                charge_point_id = session.charge_point_id.as_str(),
                charging_state = ?state,
                "Charging state changed"
            );
            session.state.charging_state = state;
            message
        }
        None => {
            warn!(
                charge_point_id = session.charge_point_id.as_str(),
                "ChargingStateChanged trigger without a chargingState"
            );
            "Unknown"
        }
    };

    build_response(None, Some(message))
}

fn build_response(status: Option<AuthorizationStatusEnumType>, message: Option<&str>) -> Value {
    let response = TransactionEventResponse {
        total_cost: None,
        charging_priority: None,
        id_token_info: status.map(|s| IdTokenInfoType {
            status: s,
            cache_expiry_date_time: None,
            charging_priority: None,
            language1: None,
            evse_id: None,
            language2: None,
            group_id_token: None,
            personal_message: None,
        }),
        updated_personal_message: message.map(personal_message),
    };

    serde_json::to_value(&response).unwrap_or_default()
}

fn personal_message(content: &str) -> MessageContentType {
    MessageContentType {
        format: MessageFormatEnumType::ASCII,
        language: Some("en".to_string()),
        content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validation::{ChargerIdentityValidator, TokenValidator};
    use crate::config::TokenAllowEntry;
    use rust_ocpp::v2_0_1::enumerations::id_token_enum_type::IdTokenEnumType;
    use serde_json::json;
    use std::sync::Arc;

    fn make_session() -> SessionHandler {
        SessionHandler::new(
            "CP001",
            Arc::new(ChargerIdentityValidator::from_entries(&[]).unwrap()),
            Arc::new(TokenValidator::new(vec![TokenAllowEntry {
                kind: IdTokenEnumType::ISO14443,
                value: "AABBCCDD".to_string(),
            }])),
            10,
        )
    }

    fn event_payload(trigger_reason: &str, extra: Value) -> Value {
        let mut payload = json!({
            "eventType": "Updated",
            "timestamp": "2024-01-01T00:00:00Z",
            "triggerReason": trigger_reason,
            "seqNo": 0,
            "transactionInfo": {"transactionId": "tx-001"}
        });
        payload
            .as_object_mut()
            .unwrap()
            .extend(extra.as_object().unwrap().clone());
        payload
    }

    #[test]
    fn authorized_with_listed_token_authorizes_session() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "Authorized",
                json!({"idToken": {"idToken": "AABBCCDD", "type": "ISO14443"}}),
            ),
        );

        assert_eq!(response["idTokenInfo"]["status"], "Accepted");
        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Charging is Authorized"
        );
        assert!(session.state.is_authorized);
        assert_eq!(session.state.transaction_id.as_deref(), Some("tx-001"));
    }

    #[test]
    fn authorized_with_unlisted_token_is_refused_without_state_change() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "Authorized",
                json!({"idToken": {"idToken": "DDCCBBAA", "type": "ISO14443"}}),
            ),
        );

        assert_eq!(response["idTokenInfo"]["status"], "Invalid");
        assert!(response["updatedPersonalMessage"].is_null());
        assert!(!session.state.is_authorized);
    }

    #[test]
    fn authorized_without_token_is_unknown() {
        let mut session = make_session();
        let response =
            handle_transaction_event(&mut session, &event_payload("Authorized", json!({})));

        assert_eq!(response["idTokenInfo"]["status"], "Unknown");
        assert!(!session.state.is_authorized);
    }

    #[test]
    fn cable_plugged_in_needs_no_authorization() {
        let mut session = make_session();
        let response =
            handle_transaction_event(&mut session, &event_payload("CablePluggedIn", json!({})));

        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Cable is plugged in"
        );
        assert!(response["idTokenInfo"].is_null());
    }

    #[test]
    fn charging_state_changed_to_charging() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "ChargingStateChanged",
                json!({"transactionInfo": {"transactionId": "tx-001", "chargingState": "Charging"}}),
            ),
        );

        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Charging started"
        );
        assert_eq!(
            session.state.charging_state,
            ChargingStateEnumType::Charging
        );
    }

    #[test]
    fn suspended_ev_reports_charging_suspended() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "ChargingStateChanged",
                json!({"transactionInfo": {"transactionId": "tx-001", "chargingState": "SuspendedEV"}}),
            ),
        );

        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Charging suspended"
        );
        assert_eq!(
            session.state.charging_state,
            ChargingStateEnumType::SuspendedEV
        );
    }

    #[test]
    fn idle_reports_charging_stopped() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "ChargingStateChanged",
                json!({"transactionInfo": {"transactionId": "tx-001", "chargingState": "Idle"}}),
            ),
        );

        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Charging stopped"
        );
    }

    #[test]
    fn ev_connected_state_is_reported_as_unknown() {
        let mut session = make_session();
        let response = handle_transaction_event(
            &mut session,
            &event_payload(
                "ChargingStateChanged",
                json!({"transactionInfo": {"transactionId": "tx-001", "chargingState": "EVConnected"}}),
            ),
        );

        assert_eq!(response["updatedPersonalMessage"]["content"], "Unknown");
        assert_eq!(
            session.state.charging_state,
            ChargingStateEnumType::EVConnected
        );
    }

    #[test]
    fn missing_charging_state_changes_nothing() {
        let mut session = make_session();
        let response =
            handle_transaction_event(&mut session, &event_payload("ChargingStateChanged", json!({})));

        assert_eq!(response["updatedPersonalMessage"]["content"], "Unknown");
        assert_eq!(session.state.charging_state, ChargingStateEnumType::Idle);
    }

    #[test]
    fn other_triggers_are_not_implemented() {
        let mut session = make_session();
        let response =
            handle_transaction_event(&mut session, &event_payload("MeterValuePeriodic", json!({})));

        assert_eq!(
            response["updatedPersonalMessage"]["content"],
            "Not implemented"
        );
        assert!(response["idTokenInfo"].is_null());
    }

    #[test]
    fn malformed_payload_yields_empty_response() {
        let mut session = make_session();
        let response = handle_transaction_event(&mut session, &json!({"eventType": "Updated"}));
        assert_eq!(response, json!({}));
        assert!(session.state.transaction_id.is_none());
    }
}
