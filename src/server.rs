//! OCPP 2.0.1 WebSocket server
//!
//! Accepts charge-point connections at `ws://<host>:<port>/{charge_point_id}`
//! (an `/ocpp/` prefix is also accepted). The subprotocol `ocpp2.0.1` is
//! mandatory; a client that does not offer it is disconnected right after
//! the handshake, before any OCPP exchange.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::application::handlers::SessionHandler;
use crate::application::validation::{ChargerIdentityValidator, TokenValidator};
use crate::config::AppConfig;
use crate::session::{ConnectionHandle, ConnectionRegistry, SharedConnectionRegistry};

/// OCPP 2.0.1 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp2.0.1";

/// OCPP Central System WebSocket server
pub struct OcppServer {
    config: Arc<AppConfig>,
    registry: SharedConnectionRegistry,
    charger_validator: Arc<ChargerIdentityValidator>,
    token_validator: Arc<TokenValidator>,
}

impl OcppServer {
    pub fn new(
        config: Arc<AppConfig>,
        charger_validator: Arc<ChargerIdentityValidator>,
        token_validator: Arc<TokenValidator>,
    ) -> Self {
        let registry = ConnectionRegistry::shared(config.security.allow_multiple_serial_numbers);
        Self {
            config,
            registry,
            charger_validator,
            token_validator,
        }
    }

    pub fn registry(&self) -> SharedConnectionRegistry {
        self.registry.clone()
    }

    /// Start the WebSocket server and accept connections until the listener
    /// fails or the task is dropped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.server.address();
        let listener = TcpListener::bind(&addr).await?;

        info!("OCPP 2.0.1 Central System listening on ws://{}", addr);
        info!(
            "   Charge points should connect to: ws://{}/{{charge_point_id}}",
            addr
        );

        while let Ok((stream, peer)) = listener.accept().await {
            self.spawn_connection(stream, peer);
        }
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let registry = self.registry.clone();
        let charger_validator = self.charger_validator.clone();
        let token_validator = self.token_validator.clone();
        let heartbeat_interval = self.config.server.heartbeat_interval;

        tokio::spawn(async move {
            if let Err(e) = handle_connection(
                stream,
                peer,
                registry,
                charger_validator,
                token_validator,
                heartbeat_interval,
            )
            .await
            {
                error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

/// Extract the charge point ID from the WebSocket request path.
/// Expected format: /{charge_point_id} or /ocpp/{charge_point_id}
fn extract_charge_point_id(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');

    if let Some(id) = path.strip_prefix("ocpp/") {
        let id = id.trim_start_matches('/');
        if !id.is_empty() && !id.contains('/') {
            return Some(id.to_string());
        }
        return None;
    }

    if !path.is_empty() && !path.contains('/') {
        return Some(path.to_string());
    }

    None
}

/// Whether the `Sec-WebSocket-Protocol` header offers our subprotocol.
fn offers_ocpp_subprotocol(header: &str) -> bool {
    header.split(',').map(str::trim).any(|p| p == OCPP_SUBPROTOCOL)
}

/// Handle a single WebSocket connection from handshake to teardown.
///
/// Messages for one connection are processed strictly in order by this
/// task; the session handler is owned here and never shared. Whatever ends
/// the loop - close frame, socket error, forced close after a rejected
/// boot - the registry entry is removed before the function returns.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SharedConnectionRegistry,
    charger_validator: Arc<ChargerIdentityValidator>,
    token_validator: Arc<TokenValidator>,
    heartbeat_interval: i32,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("New connection from: {}", peer);

    let mut charge_point_id: Option<String> = None;
    let mut negotiated = false;

    let mut ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();

            let requested_protocols = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            info!(
                "WebSocket handshake from {}: path {}, subprotocols {:?}",
                peer, path, requested_protocols
            );

            if offers_ocpp_subprotocol(requested_protocols) {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
                negotiated = true;
            }

            charge_point_id = extract_charge_point_id(path);
            Ok(response)
        },
    )
    .await?;

    if !negotiated {
        error!(
            "Client {} requested no matching subprotocol (need {}). Closing connection",
            peer, OCPP_SUBPROTOCOL
        );
        let _ = ws_stream.close(None).await;
        return Ok(());
    }

    let charge_point_id = match charge_point_id {
        Some(id) => id,
        None => {
            error!(
                "Client {} connected without a charge point ID in the path. Closing connection",
                peer
            );
            let _ = ws_stream.close(None).await;
            return Ok(());
        }
    };

    // Admission: refused duplicates are torn down with no protocol exchange.
    let handle = ConnectionHandle::new();
    let connection_id = handle.connection_id;
    if let Err(e) = registry.register(&charge_point_id, handle) {
        error!("[{}] {}. Closing connection", charge_point_id, e);
        let _ = ws_stream.close(None).await;
        return Ok(());
    }

    info!("[{}] Connected from {}", charge_point_id, peer);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task: drains queued responses, then closes the socket. Dropping
    // the last sender is what ends it, so a forced disconnect still flushes
    // the final response first.
    let cp_id_send = charge_point_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            info!("[{}] -> {}", cp_id_send, msg);
            if let Err(e) = ws_sender.send(Message::Text(msg)).await {
                error!("[{}] Send error: {}", cp_id_send, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut session = SessionHandler::new(
        charge_point_id.clone(),
        charger_validator,
        token_validator,
        heartbeat_interval,
    );

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                info!("[{}] <- {}", charge_point_id, text);

                if let Some(response) = session.handle(&text) {
                    if tx.send(response).is_err() {
                        break;
                    }
                }

                if session.must_disconnect() {
                    info!(
                        "[{}] Forcing connection close after boot rejection",
                        charge_point_id
                    );
                    break;
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                info!("[{}] Close frame received: {:?}", charge_point_id, frame);
                break;
            }
            Ok(Message::Binary(data)) => {
                warn!(
                    "[{}] Binary message received ({} bytes), ignoring",
                    charge_point_id,
                    data.len()
                );
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                error!("[{}] WebSocket error: {}", charge_point_id, e);
                break;
            }
        }
    }

    // Let the writer flush pending responses and close the socket.
    drop(tx);
    let _ = send_task.await;

    registry.unregister(&charge_point_id, connection_id);
    info!("[{}] Disconnected", charge_point_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_path_id() {
        assert_eq!(
            extract_charge_point_id("/E2507-8420-1274"),
            Some("E2507-8420-1274".to_string())
        );
    }

    #[test]
    fn extracts_ocpp_prefixed_id() {
        assert_eq!(
            extract_charge_point_id("/ocpp/CP001"),
            Some("CP001".to_string())
        );
    }

    #[test]
    fn rejects_empty_and_nested_paths() {
        assert_eq!(extract_charge_point_id("/"), None);
        assert_eq!(extract_charge_point_id("/ocpp/"), None);
        assert_eq!(extract_charge_point_id("/a/b"), None);
        assert_eq!(extract_charge_point_id("/ocpp/a/b"), None);
    }

    #[test]
    fn subprotocol_match_is_exact() {
        assert!(offers_ocpp_subprotocol("ocpp2.0.1"));
        assert!(offers_ocpp_subprotocol("ocpp1.6, ocpp2.0.1"));
        assert!(!offers_ocpp_subprotocol("ocpp1.6"));
        assert!(!offers_ocpp_subprotocol("ocpp2.0.1.1"));
        assert!(!offers_ocpp_subprotocol(""));
    }
}
