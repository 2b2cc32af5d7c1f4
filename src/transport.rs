use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::channel::Inbound;
use crate::protocol::ClientEvent;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Read timeout; bounds how long outbound events wait behind a quiet socket.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("encoding control event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("socket setup: {0}")]
    Io(#[from] io::Error),
}

/// Why a session ended.
enum Exit {
    /// Remote closed or the link dropped; reconnect.
    Lost,
    /// Render loop went away or shutdown was requested.
    Stop,
}

/// Run the WebSocket client on its own thread until `running` clears.
/// Reconnects after `RECONNECT_DELAY` whenever the link fails.
pub fn spawn(
    url: String,
    inbound: mpsc::Sender<Inbound>,
    outbound: mpsc::Receiver<ClientEvent>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            match connect(&url) {
                Ok(mut socket) => {
                    info!(%url, "connected");
                    if inbound.send(Inbound::Connected).is_err() {
                        return;
                    }
                    let exit = match session(&mut socket, &inbound, &outbound, &running) {
                        Ok(exit) => exit,
                        Err(e) => {
                            warn!(error = %e, "connection lost");
                            Exit::Lost
                        }
                    };
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    if inbound.send(Inbound::Disconnected).is_err() {
                        return;
                    }
                    if matches!(exit, Exit::Stop) {
                        return;
                    }
                }
                Err(e) => warn!(%url, error = %e, "connect failed; retrying in {:?}", RECONNECT_DELAY),
            }
            if !wait_reconnect(&outbound, &running) {
                return;
            }
        }
    })
}

fn connect(url: &str) -> Result<Socket, TransportError> {
    let (socket, _response) = tungstenite::connect(url)?;
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(POLL_INTERVAL))?,
        _ => warn!("read timeout not supported on this stream; outbound events may lag"),
    }
    Ok(socket)
}

/// Sleep out the reconnect delay. Control events issued while offline are
/// stale by the time a new link is up, so they are dropped. Returns false
/// when the thread should exit.
fn wait_reconnect(outbound: &mpsc::Receiver<ClientEvent>, running: &AtomicBool) -> bool {
    let mut waited = Duration::ZERO;
    while waited < RECONNECT_DELAY {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        loop {
            match outbound.try_recv() {
                Ok(event) => debug!(?event, "offline; dropping control event"),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        thread::sleep(SHUTDOWN_POLL);
        waited += SHUTDOWN_POLL;
    }
    true
}

fn session(
    socket: &mut Socket,
    inbound: &mpsc::Sender<Inbound>,
    outbound: &mpsc::Receiver<ClientEvent>,
    running: &AtomicBool,
) -> Result<Exit, TransportError> {
    while running.load(Ordering::Relaxed) {
        loop {
            match outbound.try_recv() {
                Ok(event) => socket.send(Message::Text(event.to_json()?))?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(Exit::Stop),
            }
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                if inbound.send(Inbound::Text(text)).is_err() {
                    return Ok(Exit::Stop);
                }
            }
            Ok(Message::Close(frame)) => {
                info!(?frame, "server closed the connection");
                return Ok(Exit::Lost);
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Exit::Stop)
}
