//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v2_0_1::messages::heartbeat::HeartbeatResponse;
use serde_json::Value;
use tracing::info;

use crate::application::handlers::SessionHandler;

/// Answer with the current server time. Heartbeats are answerable whether
/// or not the station has booted or authorized; they change no state.
pub fn handle_heartbeat(session: &SessionHandler, _payload: &Value) -> Value {
    info!(
        charge_point_id = session.charge_point_id.as_str(),
        "Heartbeat"
    );

    let response = HeartbeatResponse {
        current_time: Utc::now(),
    };

    serde_json::to_value(&response).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validation::{ChargerIdentityValidator, TokenValidator};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn responds_with_current_time() {
        let session = SessionHandler::new(
            "CP001",
            Arc::new(ChargerIdentityValidator::from_entries(&[]).unwrap()),
            Arc::new(TokenValidator::new(vec![])),
            10,
        );

        let response = handle_heartbeat(&session, &json!({}));
        assert!(response["currentTime"].is_string());
    }
}
