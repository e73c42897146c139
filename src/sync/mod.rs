//! Client-side booking status synchronization.
//!
//! [`BookingStatusSync`] keeps a local copy of one booking's status. It listens on a
//! push socket and, whenever that socket is not open, polls the status endpoint on a
//! fixed interval. A closed or failed socket is retried after a fixed delay. There is
//! no ordering between pushed and polled snapshots: the last one applied wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::errors::{AppError, ErrorDetails};
use crate::models::BookingStatusView;
use crate::realtime::{StatusHub, StatusMessage};

/// Timing knobs for [`BookingStatusSync`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Wait between a socket closing (or failing to open) and the next attempt
    pub reconnect_delay: Duration,
    /// Polling period while the socket is not open
    pub poll_interval: Duration,
    /// Upper bound on a single connect attempt
    pub connect_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Local view of a booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub connected: bool,
    pub status: Option<BookingStatusView>,
}

/// Source of push connections.
pub trait StatusSocket: Send + Sync + 'static {
    type Connection: StatusConnection;

    fn connect(
        &self,
        booking_id: &str,
    ) -> impl Future<Output = Result<Self::Connection, AppError>> + Send;
}

/// An open push connection; `None` means it closed.
pub trait StatusConnection: Send + 'static {
    fn next_message(&mut self) -> impl Future<Output = Option<StatusMessage>> + Send;
}

/// One-shot status lookup used while the socket is down.
pub trait StatusFetcher: Send + Sync + 'static {
    fn fetch_status(
        &self,
        booking_id: &str,
    ) -> impl Future<Output = Result<BookingStatusView, AppError>> + Send;
}

/// Background synchronizer for one booking. Stops when dropped.
pub struct BookingStatusSync {
    state: watch::Receiver<SyncState>,
    task: JoinHandle<()>,
}

impl BookingStatusSync {
    pub fn spawn<S, F>(
        booking_id: impl Into<String>,
        socket: S,
        fetcher: F,
        options: SyncOptions,
    ) -> Self
    where
        S: StatusSocket,
        F: StatusFetcher,
    {
        let (sender, state) = watch::channel(SyncState::default());
        let task = tokio::spawn(run(booking_id.into(), socket, fetcher, options, sender));
        Self { state, task }
    }

    /// Current snapshot.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }
}

impl Drop for BookingStatusSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S, F>(
    booking_id: String,
    socket: S,
    fetcher: F,
    options: SyncOptions,
    state: watch::Sender<SyncState>,
) where
    S: StatusSocket,
    F: StatusFetcher,
{
    let mut interval = time::interval(options.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poller = Poller { fetcher, interval };

    loop {
        let attempt = poller
            .drive(
                &booking_id,
                &state,
                time::timeout(options.connect_timeout, socket.connect(&booking_id)),
            )
            .await;

        match attempt {
            Ok(Ok(mut connection)) => {
                state.send_modify(|s| s.connected = true);
                tracing::debug!(booking_id = %booking_id, "Status socket connected");

                while let Some(message) = connection.next_message().await {
                    apply_message(&booking_id, &state, message);
                }

                state.send_modify(|s| s.connected = false);
                tracing::debug!(
                    booking_id = %booking_id,
                    "Status socket closed, reconnecting in {:?}",
                    options.reconnect_delay
                );
            }
            Ok(Err(e)) => {
                tracing::debug!(booking_id = %booking_id, "Status socket failed to open: {}", e);
            }
            Err(_) => {
                tracing::debug!(booking_id = %booking_id, "Status socket connect timed out");
            }
        }

        poller
            .drive(&booking_id, &state, time::sleep(options.reconnect_delay))
            .await;
    }
}

fn apply_message(booking_id: &str, state: &watch::Sender<SyncState>, message: StatusMessage) {
    if let StatusMessage::StatusUpdate(view) = message {
        if view.booking_id == booking_id {
            state.send_modify(|s| s.status = Some(view));
        }
    }
}

/// Polls on its interval while driving whatever the disconnected phase is waiting on.
struct Poller<F> {
    fetcher: F,
    interval: Interval,
}

impl<F: StatusFetcher> Poller<F> {
    async fn drive<T>(
        &mut self,
        booking_id: &str,
        state: &watch::Sender<SyncState>,
        fut: impl Future<Output = T>,
    ) -> T {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return out,
                _ = self.interval.tick() => {
                    match self.fetcher.fetch_status(booking_id).await {
                        Ok(view) => state.send_modify(|s| s.status = Some(view)),
                        Err(e) => tracing::warn!(booking_id = %booking_id, "Status poll failed: {}", e),
                    }
                }
            }
        }
    }
}

/// In-process socket over a [`StatusHub`].
#[derive(Clone)]
pub struct HubSocket {
    hub: Arc<StatusHub>,
}

impl HubSocket {
    pub fn new(hub: Arc<StatusHub>) -> Self {
        Self { hub }
    }
}

pub struct HubConnection {
    receiver: broadcast::Receiver<StatusMessage>,
}

impl StatusSocket for HubSocket {
    type Connection = HubConnection;

    async fn connect(&self, booking_id: &str) -> Result<HubConnection, AppError> {
        Ok(HubConnection {
            receiver: self.hub.subscribe(booking_id),
        })
    }
}

impl StatusConnection for HubConnection {
    async fn next_message(&mut self) -> Option<StatusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Status subscriber lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// WebSocket to `GET {base_url}/api/bookings/{id}/ws`.
#[derive(Clone)]
pub struct WsStatusSocket {
    base_url: String,
}

impl WsStatusSocket {
    /// `base_url` is the HTTP address of the API; `http`/`https` become `ws`/`wss`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/');
        let base_url = match (
            base_url.strip_prefix("https://"),
            base_url.strip_prefix("http://"),
        ) {
            (Some(rest), _) => format!("wss://{}", rest),
            (_, Some(rest)) => format!("ws://{}", rest),
            _ => base_url.to_string(),
        };
        Self { base_url }
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl StatusSocket for WsStatusSocket {
    type Connection = WsConnection;

    async fn connect(&self, booking_id: &str) -> Result<WsConnection, AppError> {
        let url = format!("{}/api/bookings/{}/ws", self.base_url, booking_id);
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| AppError::Internal(format!("Status socket connect failed: {}", e)))?;
        Ok(WsConnection { stream })
    }
}

impl StatusConnection for WsConnection {
    async fn next_message(&mut self) -> Option<StatusMessage> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                    Ok(message) => return Some(message),
                    Err(e) => tracing::warn!("Ignoring malformed status message: {}", e),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Status socket error: {}", e);
                    return None;
                }
            }
        }
        None
    }
}

/// Polls `GET {base_url}/api/bookings/{id}/status`.
#[derive(Clone)]
pub struct HttpStatusFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<ErrorDetails>,
}

impl StatusFetcher for HttpStatusFetcher {
    async fn fetch_status(&self, booking_id: &str) -> Result<BookingStatusView, AppError> {
        let response = self
            .client
            .get(format!("{}/api/bookings/{}/status", self.base_url, booking_id))
            .send()
            .await?;
        let http_status = response.status();
        let body: Envelope<BookingStatusView> = response.json().await?;

        match (body.data, body.error) {
            (Some(view), _) => Ok(view),
            (None, Some(error)) if http_status == reqwest::StatusCode::NOT_FOUND => {
                Err(AppError::NotFound(error.message))
            }
            (None, Some(error)) => Err(AppError::Internal(format!(
                "Status fetch failed ({}): {}",
                http_status, error.message
            ))),
            (None, None) => Err(AppError::Internal(format!(
                "Status fetch failed ({}): empty response",
                http_status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::BookingStatus;

    fn view(booking_id: &str, status: BookingStatus) -> BookingStatusView {
        BookingStatusView {
            booking_id: booking_id.to_string(),
            status,
            driver_id: None,
            updated_at: "2026-10-18T12:00:00Z".to_string(),
        }
    }

    #[derive(Clone, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl StatusFetcher for CountingFetcher {
        async fn fetch_status(&self, booking_id: &str) -> Result<BookingStatusView, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(view(booking_id, BookingStatus::Pending))
        }
    }

    /// Socket that never opens.
    #[derive(Clone, Default)]
    struct RefusingSocket {
        attempts: Arc<AtomicUsize>,
    }

    impl StatusSocket for RefusingSocket {
        type Connection = ClosedConnection;

        async fn connect(&self, _booking_id: &str) -> Result<ClosedConnection, AppError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Internal("connection refused".to_string()))
        }
    }

    /// Socket that opens and closes straight away.
    #[derive(Clone, Default)]
    struct FlakySocket {
        attempts: Arc<AtomicUsize>,
    }

    struct ClosedConnection;

    impl StatusConnection for ClosedConnection {
        async fn next_message(&mut self) -> Option<StatusMessage> {
            None
        }
    }

    impl StatusSocket for FlakySocket {
        type Connection = ClosedConnection;

        async fn connect(&self, _booking_id: &str) -> Result<ClosedConnection, AppError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(ClosedConnection)
        }
    }

    /// Socket whose connect never completes.
    struct HangingSocket;

    impl StatusSocket for HangingSocket {
        type Connection = ClosedConnection;

        async fn connect(&self, _booking_id: &str) -> Result<ClosedConnection, AppError> {
            std::future::pending().await
        }
    }

    async fn wait_until(
        receiver: &mut watch::Receiver<SyncState>,
        predicate: impl Fn(&SyncState) -> bool,
    ) {
        time::timeout(Duration::from_secs(5), async {
            while !predicate(&receiver.borrow_and_update()) {
                receiver.changed().await.unwrap();
            }
        })
        .await
        .expect("state never matched");
    }

    #[tokio::test]
    async fn test_pushed_status_update_becomes_local_state() {
        let hub = Arc::new(StatusHub::new());
        let sync = BookingStatusSync::spawn(
            "b1",
            HubSocket::new(hub.clone()),
            CountingFetcher::default(),
            SyncOptions::default(),
        );
        let mut receiver = sync.subscribe();
        wait_until(&mut receiver, |s| s.connected).await;

        hub.publish("b1", StatusMessage::StatusUpdate(view("b1", BookingStatus::Confirmed)));
        wait_until(&mut receiver, |s| s.status.is_some()).await;
        assert_eq!(sync.state().status, Some(view("b1", BookingStatus::Confirmed)));

        hub.publish("b1", StatusMessage::StatusUpdate(view("b1", BookingStatus::InProgress)));
        wait_until(&mut receiver, |s| {
            s.status.as_ref().map(|v| v.status) == Some(BookingStatus::InProgress)
        })
        .await;
    }

    #[tokio::test]
    async fn test_updates_for_other_bookings_are_ignored() {
        let (sender, _receiver) = watch::channel(SyncState::default());
        apply_message(
            "b1",
            &sender,
            StatusMessage::StatusUpdate(view("b2", BookingStatus::Cancelled)),
        );
        assert!(sender.borrow().status.is_none());

        apply_message(
            "b1",
            &sender,
            StatusMessage::StatusUpdate(view("b1", BookingStatus::Cancelled)),
        );
        assert_eq!(
            sender.borrow().status.as_ref().map(|v| v.status),
            Some(BookingStatus::Cancelled)
        );
    }

    #[test]
    fn test_ws_socket_switches_scheme() {
        assert_eq!(
            WsStatusSocket::new("http://127.0.0.1:8080/").base_url,
            "ws://127.0.0.1:8080"
        );
        assert_eq!(
            WsStatusSocket::new("https://rides.example.com").base_url,
            "wss://rides.example.com"
        );
        assert_eq!(
            WsStatusSocket::new("ws://localhost:1").base_url,
            "ws://localhost:1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let socket = FlakySocket::default();
        let attempts = socket.attempts.clone();
        let _sync = BookingStatusSync::spawn(
            "b1",
            socket,
            CountingFetcher::default(),
            SyncOptions::default(),
        );

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_every_interval_when_socket_never_opens() {
        let socket = RefusingSocket::default();
        let attempts = socket.attempts.clone();
        let fetcher = CountingFetcher::default();
        let calls = fetcher.calls.clone();
        let sync = BookingStatusSync::spawn("b1", socket, fetcher, SyncOptions::default());

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            sync.state().status.map(|v| v.status),
            Some(BookingStatus::Pending)
        );
        assert!(!sync.state().connected);

        time::sleep(Duration::from_secs(60)).await;
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(attempts.load(Ordering::SeqCst) >= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_connect_does_not_stop_polling() {
        let fetcher = CountingFetcher::default();
        let calls = fetcher.calls.clone();
        let _sync = BookingStatusSync::spawn("b1", HangingSocket, fetcher, SyncOptions::default());

        time::sleep(Duration::from_secs(61)).await;
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }
}
