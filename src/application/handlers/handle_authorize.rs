//! Authorize handler

use rust_ocpp::v2_0_1::datatypes::id_token_info_type::IdTokenInfoType;
use rust_ocpp::v2_0_1::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use serde_json::Value;
use tracing::{error, info};

use crate::application::handlers::SessionHandler;

/// Classify the presented token and return the verdict.
///
/// Authorize on its own never marks the session as authorized; that only
/// happens through the `Authorized` transaction event trigger.
pub fn handle_authorize(session: &SessionHandler, payload: &Value) -> Value {
    let req: AuthorizeRequest = match serde_json::from_value(payload.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(
                charge_point_id = session.charge_point_id.as_str(),
                error = %e,
                "Failed to deserialize AuthorizeRequest"
            );
            return serde_json::json!({});
        }
    };

    let status = session.token_validator.validate(&req.id_token);

    info!(
        charge_point_id = session.charge_point_id.as_str(),
        id_token = req.id_token.id_token.as_str(),
        token_type = ?req.id_token.kind,
        status = ?status,
        "Authorize"
    );

    let response = AuthorizeResponse {
        certificate_status: None,
        id_token_info: IdTokenInfoType {
            status,
            cache_expiry_date_time: None,
            charging_priority: None,
            language1: None,
            evse_id: None,
            language2: None,
            group_id_token: None,
            personal_message: None,
        },
    };

    serde_json::to_value(&response).unwrap_or_default()
}
