//! BootNotification handler

use chrono::Utc;
use rust_ocpp::v2_0_1::enumerations::registration_status_enum_type::RegistrationStatusEnumType;
use rust_ocpp::v2_0_1::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::application::handlers::SessionHandler;
use crate::domain::ChargePointIdentity;

pub fn handle_boot_notification(session: &mut SessionHandler, payload: &Value) -> Value {
    // Some charging stations omit the mandatory `reason` field.
    // Inject a default ("PowerUp") before deserializing so we don't reject the message.
    let mut patched = payload.clone();
    if let Some(obj) = patched.as_object_mut() {
        obj.entry("reason").or_insert(serde_json::json!("PowerUp"));
    }

    let req: BootNotificationRequest = match serde_json::from_value(patched) {
        Ok(r) => r,
        Err(e) => {
            error!(
                charge_point_id = session.charge_point_id.as_str(),
                error = %e,
                "Failed to deserialize BootNotificationRequest"
            );
            return serde_json::json!({});
        }
    };

    let cs = &req.charging_station;
    let serial_number = cs.serial_number.as_deref().unwrap_or_default();

    let accepted =
        session
            .charger_validator
            .validate(&cs.vendor_name, &cs.model, serial_number);

    let status = if accepted {
        session.state.boot_accepted(ChargePointIdentity::new(
            serial_number,
            cs.vendor_name.as_str(),
            cs.model.as_str(),
        ));
        info!(
            charge_point_id = session.charge_point_id.as_str(),
            vendor = cs.vendor_name.as_str(),
            model = cs.model.as_str(),
            serial = serial_number,
            reason = ?req.reason,
            "BootNotification accepted"
        );
        RegistrationStatusEnumType::Accepted
    } else {
        session.state.boot_rejected();
        warn!(
            charge_point_id = session.charge_point_id.as_str(),
            vendor = cs.vendor_name.as_str(),
            model = cs.model.as_str(),
            serial = serial_number,
            "BootNotification rejected, connection will be closed"
        );
        RegistrationStatusEnumType::Rejected
    };

    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: session.heartbeat_interval as u16,
        status,
        status_info: None,
    };

    serde_json::to_value(&response).unwrap_or_default()
}
