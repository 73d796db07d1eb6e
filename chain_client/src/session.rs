//! Live subscription session.
//!
//! A `Session` owns at most one transport to the pricing feed, the request that
//! was sent over it, the current `ConnectionStatus` and the latest `Snapshot`.
//! Transports report back through a single event channel; the owner of the
//! session drains that channel on one thread and feeds each event to
//! [`Session::handle_event`], which is the only place state changes in
//! response to the network.
//!
//! Invariants:
//! - Close-before-open: `connect` closes the current transport before asking
//!   the connector for a new one, and events from any superseded connection id
//!   are dropped, so two transports never feed the same session.
//! - Latest-wins: a decoded snapshot replaces the previous one as a whole
//!   (`Arc<Snapshot>`); failures never clear it.
//! - No automatic retry. A new `connect` is the only way back to `Connected`.
use crate::transport::{ConnectionId, Connector, EventSink, SessionEvent, Transport, TransportEvent};
use chain_common::net::FEED_URL;
use chain_common::{ConnectionStatus, Result, Snapshot, SubscriptionRequest};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;

/// Failures the session absorbs and reports instead of propagating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The transport never opened.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// The remote side closed an open transport.
    #[error("Feed closed by the remote side")]
    RemoteClosed,

    /// The transport broke after it was opened.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// An inbound frame could not be decoded into a snapshot.
    #[error("Decode failure: {0}")]
    DecodeFailure(String),
}

/// Raw input values as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Instrument identifier.
    pub symbol: String,
    /// Strike price, not yet parsed.
    pub strike: String,
    /// Expiry date, `YYYY-MM-DD`.
    pub expiry: String,
    /// Comma separated spot prices.
    pub spot_range: String,
}

impl ConnectParams {
    /// Build the request these inputs describe.
    pub fn to_request(&self) -> Result<SubscriptionRequest> {
        SubscriptionRequest::from_inputs(&self.symbol, &self.strike, &self.expiry, &self.spot_range)
    }
}

/// Copy of the observable session state pushed to subscribers on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    /// Connection status.
    pub status: ConnectionStatus,
    /// Latest snapshot, kept across disconnects.
    pub snapshot: Option<Arc<Snapshot>>,
    /// Most recent failure since the last connect.
    pub error: Option<SessionError>,
}

/// Status reached after applying `event` in state `status`.
pub fn transition(status: ConnectionStatus, event: &TransportEvent) -> ConnectionStatus {
    match event {
        TransportEvent::Opened => ConnectionStatus::Connected,
        TransportEvent::Text(_) | TransportEvent::Binary(_) => status,
        TransportEvent::Closed => ConnectionStatus::Disconnected,
        TransportEvent::Failed(_) | TransportEvent::Error(_) => ConnectionStatus::Error,
    }
}

/// The transport currently owned by the session and the request it will carry.
struct ActiveTransport {
    id: ConnectionId,
    handle: Box<dyn Transport>,
    request: SubscriptionRequest,
}

/// Session manager for one feed subscription.
pub struct Session<C: Connector> {
    connector: C,
    endpoint: String,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    last_connection: ConnectionId,
    active: Option<ActiveTransport>,
    request: Option<SubscriptionRequest>,
    status: ConnectionStatus,
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<SessionError>,
    observers: Vec<Sender<SessionUpdate>>,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session for the live feed endpoint.
    pub fn new(connector: C) -> Self {
        Self::with_endpoint(connector, FEED_URL)
    }

    /// Creates a disconnected session for a custom endpoint.
    pub fn with_endpoint(connector: C, endpoint: &str) -> Self {
        let (events_tx, events_rx) = unbounded::<SessionEvent>();
        Session {
            connector,
            endpoint: endpoint.to_string(),
            events_tx,
            events_rx,
            last_connection: 0,
            active: None,
            request: None,
            status: ConnectionStatus::Disconnected,
            snapshot: None,
            last_error: None,
            observers: Vec::new(),
        }
    }

    /// (Re)connect with the given raw inputs.
    ///
    /// Invalid inputs are returned as an error and leave the session as it
    /// was. Otherwise the call never fails: the outcome of the connection is
    /// observed through [`Session::status`].
    pub fn connect(&mut self, params: &ConnectParams) -> Result<()> {
        let request = params.to_request()?;
        self.connect_with(request);
        Ok(())
    }

    /// (Re)connect with an already built request.
    pub fn connect_with(&mut self, request: SubscriptionRequest) {
        if self.close_active() {
            info!("Superseding the current feed connection");
        }

        self.last_connection += 1;
        let id = self.last_connection;
        let sink = EventSink::new(id, self.events_tx.clone());
        info!(
            "Connecting #{} for {} strike={} expiry={} spots={:?}",
            id, request.symbol, request.strike, request.expiry, request.spot_range
        );
        let handle = self.connector.open(&self.endpoint, sink);
        self.active = Some(ActiveTransport { id, handle, request });
        self.status = ConnectionStatus::Connecting;
        self.last_error = None;
        self.notify();
    }

    /// Tear down the feed. A no-op when already disconnected.
    pub fn disconnect(&mut self) {
        let closed = self.close_active();
        if closed || self.status != ConnectionStatus::Disconnected {
            info!("Feed disconnected");
            self.status = ConnectionStatus::Disconnected;
            self.notify();
        }
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: SessionEvent) {
        let Some(id) = self.active.as_ref().map(|active| active.id) else {
            debug!("Dropping event from #{} with no active transport", event.connection);
            return;
        };
        if id != event.connection {
            debug!("Dropping event from superseded connection #{}", event.connection);
            return;
        }

        let next = transition(self.status, &event.event);
        match event.event {
            TransportEvent::Opened => {
                info!("Connection #{} open", id);
                self.status = next;
                self.send_request();
            }
            TransportEvent::Text(text) => self.ingest(Snapshot::decode(&text)),
            TransportEvent::Binary(bytes) => self.ingest(Snapshot::decode_bytes(&bytes)),
            TransportEvent::Closed => self.lose_transport(next, SessionError::RemoteClosed),
            TransportEvent::Failed(reason) => self.lose_transport(next, SessionError::ConnectionFailure(reason)),
            TransportEvent::Error(reason) => self.lose_transport(next, SessionError::TransportError(reason)),
        }
        self.notify();
    }

    /// Apply every transport event that is already queued. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Receiver for transport events, for callers that multiplex it with other channels.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Register an observer. It receives a `SessionUpdate` after every change.
    pub fn subscribe(&mut self) -> Receiver<SessionUpdate> {
        let (tx, rx) = unbounded::<SessionUpdate>();
        self.observers.push(tx);
        rx
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Most recently decoded snapshot, if any has arrived.
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Request sent over the most recent connection, if any was sent.
    pub fn request(&self) -> Option<&SubscriptionRequest> {
        self.request.as_ref()
    }

    /// Most recent failure since the last connect.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Current observable state.
    pub fn current(&self) -> SessionUpdate {
        SessionUpdate {
            status: self.status,
            snapshot: self.snapshot.clone(),
            error: self.last_error.clone(),
        }
    }

    fn send_request(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let sent = active
            .request
            .to_json()
            .and_then(|json| active.handle.send_text(json));
        match sent {
            Ok(()) => {
                info!("Subscription request sent on #{}", active.id);
                self.request = Some(active.request.clone());
            }
            Err(e) => {
                error!("Failed to send subscription request on #{}: {}", active.id, e);
                let next = transition(self.status, &TransportEvent::Error(e.to_string()));
                self.lose_transport(next, SessionError::TransportError(e.to_string()));
            }
        }
    }

    fn ingest(&mut self, decoded: Result<Snapshot>) {
        match decoded {
            Ok(snapshot) => {
                debug!(
                    "Snapshot {} vix={} rows={}",
                    snapshot.symbol,
                    snapshot.vix,
                    snapshot.rows.len()
                );
                self.snapshot = Some(Arc::new(snapshot));
            }
            Err(e) => {
                warn!("Keeping previous snapshot, inbound frame not decoded: {}", e);
                self.last_error = Some(SessionError::DecodeFailure(e.to_string()));
            }
        }
    }

    fn lose_transport(&mut self, next: ConnectionStatus, reason: SessionError) {
        warn!("Feed lost: {}", reason);
        self.close_active();
        self.status = next;
        self.last_error = Some(reason);
    }

    /// Close and forget the active transport. Returns whether there was one.
    fn close_active(&mut self) -> bool {
        match self.active.take() {
            Some(mut active) => {
                debug!("Closing connection #{}", active.id);
                active.handle.close();
                true
            }
            None => false,
        }
    }

    fn notify(&mut self) {
        let update = self.current();
        self.observers.retain(|tx| tx.send(update.clone()).is_ok());
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        self.close_active();
    }
}
