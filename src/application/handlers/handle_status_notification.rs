//! StatusNotification handler

use rust_ocpp::v2_0_1::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use serde_json::Value;
use tracing::{error, info};

use crate::application::handlers::SessionHandler;

/// Record the reported connector status.
///
/// Single-connector model: `evse_id` and `connector_id` are logged but not
/// modeled, the station has one status.
pub fn handle_status_notification(session: &mut SessionHandler, payload: &Value) -> Value {
    let req: StatusNotificationRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                charge_point_id = session.charge_point_id.as_str(),
                error = %e,
                "Failed to deserialize StatusNotificationRequest"
            );
            return serde_json::json!({});
        }
    };

    info!(
        charge_point_id = session.charge_point_id.as_str(),
        evse_id = req.evse_id,
        connector_id = req.connector_id,
        status = ?req.connector_status,
        "StatusNotification"
    );

    session.state.connector_status = req.connector_status;

    serde_json::to_value(&StatusNotificationResponse {}).unwrap_or_default()
}
