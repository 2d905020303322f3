//! WebSocket client transport (tungstenite).

use std::net::TcpStream;

use tungstenite::WebSocket;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;

use super::{Transport, TransportError};

/// Client-side WebSocket transport.
///
/// The socket is switched to non-blocking after the handshake so
/// [`Transport::recv`] is a poll, matching the single-threaded run loop.
pub struct WsTransport {
    ws: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Dial a `ws://` endpoint and complete the WebSocket handshake.
    pub fn dial(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = tungstenite::connect(url).map_err(|e| Box::new(e))?;

        // Keep blocking mode during handshake, switch to non-blocking
        // for polling reads
        if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
            stream.set_nonblocking(true)?;
        }

        Ok(Self { ws })
    }
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .map_err(|e| Box::new(e).into())
    }

    fn send_binary(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.ws
            .send(Message::Binary(bytes.to_vec().into()))
            .map_err(|e| Box::new(e).into())
    }

    fn recv(&mut self) -> Result<Option<String>, TransportError> {
        match self.ws.read() {
            Ok(Message::Text(text)) => Ok(Some(text.to_string())),
            Ok(Message::Close(_)) => Err(TransportError::Closed),
            // Ping/pong are answered by tungstenite internally
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Err(TransportError::Closed)
            }
            Err(e) => Err(Box::new(e).into()),
        }
    }
}
