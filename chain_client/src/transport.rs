//! Streaming transport to the pricing feed.
//!
//! A `Connector` opens a `Transport` handle without blocking the caller. The
//! actual network work happens on a worker thread which reports everything it
//! observes (open, frames, close, failures) as `TransportEvent`s into the
//! session's event channel, tagged with the connection id it was opened for.
//! The handle only forwards outbound commands (a text frame or close) back to
//! that worker over a `crossbeam_channel`.
//!
//! Closing a handle is synchronous: it cancels a handshake still in flight by
//! shutting its TCP stream down, and waits (bounded by `CLOSE_TIMEOUT`) until the
//! worker has sent its close frame and exited. When `close` returns, the old
//! connection no longer exists on the network.
use chain_common::ChainError;
use chain_common::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use log::{debug, error, info, warn};
use std::io::{self, ErrorKind};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::handshake::client::ClientHandshake;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How long a worker blocks on a read before it checks for outbound commands.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on how long `close` waits for the worker to exit.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Sequence number identifying one transport opened by a session.
pub type ConnectionId = u64;

/// Everything a transport can report back to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is established and ready to send.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// A binary frame arrived.
    Binary(Vec<u8>),
    /// The remote side closed an open connection.
    Closed,
    /// The connection could not be established.
    Failed(String),
    /// The connection broke after it was established.
    Error(String),
}

/// A transport event together with the connection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Connection the event belongs to.
    pub connection: ConnectionId,
    /// What happened.
    pub event: TransportEvent,
}

/// Write end of a session's event channel, bound to one connection id.
#[derive(Debug, Clone)]
pub struct EventSink {
    connection: ConnectionId,
    tx: Sender<SessionEvent>,
}

impl EventSink {
    /// Binds `tx` to `connection`.
    pub fn new(connection: ConnectionId, tx: Sender<SessionEvent>) -> Self {
        Self { connection, tx }
    }

    /// Connection this sink reports for.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Deliver an event. Returns `false` once the session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent {
                connection: self.connection,
                event,
            })
            .is_ok()
    }
}

/// Handle to one live connection owned by a session.
pub trait Transport {
    /// Queue a complete text frame for sending.
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the connection. Calling it again is a no-op.
    fn close(&mut self);
}

/// Opens transports. Must return immediately; the outcome is reported through `sink`.
pub trait Connector {
    /// Start opening a transport to `url`.
    fn open(&self, url: &str, sink: EventSink) -> Box<dyn Transport>;
}

/// Commands sent from a `WsTransport` handle to its worker thread.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Cancellation state shared by a `WsTransport` handle and its worker.
///
/// While the handshake runs, `handshake` holds a clone of the TCP stream so that
/// `cancel` can shut it down and unblock the worker. The flag is checked with
/// the lock held, so a stream is never registered after a cancel went through.
#[derive(Debug, Default)]
struct Cancel {
    cancelled: AtomicBool,
    handshake: Mutex<Option<TcpStream>>,
}

impl Cancel {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.handshake.lock() {
            if let Some(stream) = slot.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }

    /// Register `stream` for the handshake. Returns `false` if already cancelled.
    fn register(&self, stream: &TcpStream) -> Result<bool> {
        let mut slot = self.handshake.lock()?;
        if self.is_cancelled() {
            return Ok(false);
        }
        *slot = Some(stream.try_clone()?);
        Ok(true)
    }

    fn release(&self) -> Result<()> {
        self.handshake.lock()?.take();
        Ok(())
    }
}

/// WebSocket connector backed by blocking `tungstenite` on a worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &str, sink: EventSink) -> Box<dyn Transport> {
        let (commands_tx, commands_rx) = unbounded::<Outbound>();
        // Never sent on; disconnects when the worker returns.
        let (done_tx, done_rx) = bounded::<()>(0);
        let cancel = Arc::new(Cancel::default());
        let worker_cancel = Arc::clone(&cancel);
        let url = url.to_string();
        info!("Opening feed connection #{} to {}", sink.connection(), url);
        thread::spawn(move || {
            run_worker(&url, sink, commands_rx, &worker_cancel);
            drop(done_tx);
        });
        Box::new(WsTransport {
            commands: commands_tx,
            cancel,
            done: done_rx,
            closed: false,
        })
    }
}

/// Handle to a WebSocket worker thread.
pub struct WsTransport {
    commands: Sender<Outbound>,
    cancel: Arc<Cancel>,
    done: Receiver<()>,
    closed: bool,
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.commands
            .send(Outbound::Text(text))
            .map_err(|e| ChainError::ChannelSend(format!("feed worker is gone: {}", e)))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        // The worker may already have exited after a remote close.
        let _ = self.commands.send(Outbound::Close);
        if let Err(RecvTimeoutError::Timeout) = self.done.recv_timeout(CLOSE_TIMEOUT) {
            warn!("Feed worker still running {:?} after close", CLOSE_TIMEOUT);
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

type FeedSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Worker body: connect, report, then pump reads and outbound commands until
/// either side closes.
fn run_worker(url: &str, sink: EventSink, commands: Receiver<Outbound>, cancel: &Cancel) {
    let id = sink.connection();
    let mut socket = match open_socket(url, cancel) {
        Ok(Some(socket)) => socket,
        Ok(None) => {
            debug!("Connection #{} cancelled before it opened", id);
            return;
        }
        Err(_) if cancel.is_cancelled() => {
            debug!("Connection #{} cancelled during the handshake", id);
            return;
        }
        Err(e) => {
            error!("Connection #{} failed to open: {}", id, e);
            sink.emit(TransportEvent::Failed(e.to_string()));
            return;
        }
    };

    if !sink.emit(TransportEvent::Opened) {
        close_quietly(&mut socket);
        return;
    }

    loop {
        loop {
            match commands.try_recv() {
                Ok(Outbound::Text(text)) => {
                    if let Err(e) = socket.send(Message::text(text)) {
                        error!("Connection #{} send failed: {}", id, e);
                        sink.emit(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                Ok(Outbound::Close) | Err(TryRecvError::Disconnected) => {
                    debug!("Connection #{} closed by the client", id);
                    close_quietly(&mut socket);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if !sink.emit(TransportEvent::Text(text.as_str().to_owned())) {
                    close_quietly(&mut socket);
                    return;
                }
            }
            Ok(Message::Binary(bytes)) => {
                if !sink.emit(TransportEvent::Binary(bytes.to_vec())) {
                    close_quietly(&mut socket);
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                warn!("Connection #{} closed by the remote side: {:?}", id, frame);
                // Sends the queued close reply.
                let _ = socket.flush();
                sink.emit(TransportEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e)) if is_timeout(&e) => continue,
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                warn!("Connection #{} dropped by the remote side", id);
                sink.emit(TransportEvent::Closed);
                return;
            }
            Err(e) => {
                error!("Connection #{} receive error: {}", id, e);
                sink.emit(TransportEvent::Error(e.to_string()));
                return;
            }
        }
    }
}

/// Connect and handshake, then switch the socket to polling reads.
/// Returns `None` if the handle was closed before the socket could be used.
fn open_socket(url: &str, cancel: &Cancel) -> Result<Option<FeedSocket>> {
    let request = url.into_client_request()?;
    let uri = request.uri();
    let host = uri
        .host()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| ChainError::InvalidInput(format!("no host in {}", url)))?;
    let port = uri
        .port_u16()
        .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

    let stream = TcpStream::connect((host.as_str(), port))?;
    if !cancel.register(&stream)? {
        return Ok(None);
    }
    let handshake = tungstenite::client_tls(request, stream);
    cancel.release()?;

    let (mut socket, response) = handshake.map_err(handshake_error)?;
    if cancel.is_cancelled() {
        close_quietly(&mut socket);
        return Ok(None);
    }
    debug!("Handshake with {} answered {}", url, response.status());
    set_read_timeout(&mut socket, Some(POLL_INTERVAL))?;
    Ok(Some(socket))
}

fn handshake_error(e: HandshakeError<ClientHandshake<MaybeTlsStream<TcpStream>>>) -> ChainError {
    match e {
        HandshakeError::Failure(e) => ChainError::WebSocket(e),
        HandshakeError::Interrupted(_) => {
            ChainError::Io(io::Error::new(ErrorKind::WouldBlock, "handshake interrupted"))
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut
}

fn set_read_timeout(socket: &mut FeedSocket, timeout: Option<Duration>) -> io::Result<()> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
        MaybeTlsStream::NativeTls(stream) => stream.get_mut().set_read_timeout(timeout),
        _ => Ok(()),
    }
}

fn close_quietly(socket: &mut FeedSocket) {
    let _ = socket.close(None);
    let _ = socket.flush();
}
