//! OCPP 2.0.1 message handlers
//!
//! Routes action names parsed from `OcppFrame::Call` to their handlers.
//! Payloads are deserialized into `rust_ocpp::v2_0_1` types within each
//! handler; a handler never panics on malformed input, it logs and answers
//! with an empty payload.

use serde_json::Value;
use tracing::error;

mod handle_authorize;
mod handle_boot_notification;
mod handle_heartbeat;
mod handle_status_notification;
mod handle_transaction_event;
mod session_handler;

pub use handle_authorize::handle_authorize;
pub use handle_boot_notification::handle_boot_notification;
pub use handle_heartbeat::handle_heartbeat;
pub use handle_status_notification::handle_status_notification;
pub use handle_transaction_event::handle_transaction_event;
pub use session_handler::SessionHandler;

/// Route an OCPP 2.0.1 action to its handler.
///
/// `action` is the string action name from the OCPP-J Call frame. Returns
/// the response payload; unknown actions get an empty acknowledgment so
/// every inbound Call still resolves to exactly one CallResult.
pub fn action_matcher(session: &mut SessionHandler, action: &str, payload: &Value) -> Value {
    match action {
        "Authorize" => handle_authorize(session, payload),
        "BootNotification" => handle_boot_notification(session, payload),
        "Heartbeat" => handle_heartbeat(session, payload),
        "StatusNotification" => handle_status_notification(session, payload),
        "TransactionEvent" => handle_transaction_event(session, payload),

        unknown => {
            error!(
                charge_point_id = session.charge_point_id.as_str(),
                action = unknown,
                "Unknown OCPP 2.0.1 action"
            );
            serde_json::json!({})
        }
    }
}
