//! Production websocket transport (plain `ws://`).
//!
//! Only compiled with the `ws-transport` feature. The socket is switched
//! to non-blocking mode after the handshake so [`poll`] can drain frames
//! without stalling the caller's tick; the handshake itself is blocking
//! and runs when a (re)connection attempt fires.
//!
//! [`poll`]: crate::DuplexTransport::poll

use std::io::ErrorKind;
use std::net::TcpStream;

use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message as WsMessage, WebSocket};

use crate::error::LiveboardError;
use crate::game_record::GameId;
use crate::{DuplexTransport, TransportEvent};

/// A [`DuplexTransport`] over a `tungstenite` websocket.
///
/// The stream URL is `<base_url>/<game_id>`.
pub struct WsTransport {
    base_url: String,
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    /// Events produced outside `poll` (open results), delivered on the
    /// next `poll`.
    pending: Vec<TransportEvent>,
}

impl WsTransport {
    /// Creates a transport connecting under `base_url`, e.g.
    /// `"ws://example.org/games"`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            socket: None,
            pending: Vec::new(),
        }
    }

    fn url_for(&self, game_id: &GameId) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), game_id)
    }
}

impl DuplexTransport for WsTransport {
    fn open(&mut self, game_id: &GameId) {
        let url = self.url_for(game_id);
        match tungstenite::connect(url.as_str()) {
            Ok((mut socket, _response)) => {
                if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("could not switch {url} to non-blocking mode: {e}");
                        self.pending.push(TransportEvent::Closed { clean: false });
                        return;
                    }
                }
                debug!("websocket open: {url}");
                self.socket = Some(socket);
                self.pending.push(TransportEvent::Opened);
            }
            Err(e) => {
                warn!("websocket connect to {url} failed: {e}");
                self.pending.push(TransportEvent::Closed { clean: false });
            }
        }
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(socket) = self.socket.as_mut() else {
            return events;
        };
        loop {
            match socket.read() {
                Ok(WsMessage::Text(text)) => events.push(TransportEvent::Inbound(text)),
                Ok(WsMessage::Close(_)) => {
                    events.push(TransportEvent::Closed { clean: true });
                    self.socket = None;
                    break;
                }
                // Pings are answered internally by tungstenite; binary
                // frames have no meaning in this protocol.
                Ok(_) => {}
                Err(WsError::Io(e)) if e.kind() == ErrorKind::WouldBlock => break,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    events.push(TransportEvent::Closed { clean: true });
                    self.socket = None;
                    break;
                }
                Err(e) => {
                    warn!("websocket read failed: {e}");
                    events.push(TransportEvent::Closed { clean: false });
                    self.socket = None;
                    break;
                }
            }
        }
        events
    }

    fn send(&mut self, text: &str) -> Result<(), LiveboardError> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(LiveboardError::NotConnected);
        };
        match socket.send(WsMessage::Text(text.to_owned())) {
            Ok(()) => Ok(()),
            // The frame is queued inside tungstenite and flushes with the
            // next I/O round.
            Err(WsError::Io(e)) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => {
                warn!("websocket send failed: {e}");
                self.socket = None;
                self.pending.push(TransportEvent::Closed { clean: false });
                Err(LiveboardError::NotConnected)
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("base_url", &self.base_url)
            .field("connected", &self.socket.is_some())
            .finish_non_exhaustive()
    }
}
