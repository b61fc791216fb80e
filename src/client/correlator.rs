//! Command correlator: request/reply semantics over the relay.
//!
//! [`Correlator::send`] assigns a fresh id to every command, registers it
//! in the [`PendingRequests`] table and queues the envelope for the
//! transport task. Frames read by the transport come back through
//! [`Correlator::handle_incoming`], which settles, extends or rejects the
//! matching request.
//!
//! The correlator is transport-agnostic: [`Correlator::attach`] hands out
//! the outbound queue of a freshly opened socket and
//! [`Correlator::detach`] tears it down, rejecting everything still in
//! flight. [`super::transport`] drives both against a real WebSocket.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use super::pending::PendingRequests;
use crate::config::ClientConfig;
use crate::error::CorrelatorError;
use crate::protocol::{
    BroadcastEnvelope, CommandMessage, Envelope, ErrorCode, ForwardEnvelope, ForwardKind,
    JoinEnvelope, NoticeCode, PeerInfo, SystemEnvelope, SystemMessage, VersionSkew,
};

/// The command that joins a channel instead of being forwarded.
pub const JOIN_COMMAND: &str = "join";

#[derive(Debug, Default)]
struct Session {
    outbound: Option<mpsc::UnboundedSender<Envelope>>,
    channel: Option<String>,
    rejected: bool,
    peer: Option<PeerInfo>,
    advisory: Option<VersionSkew>,
}

#[derive(Debug)]
struct Shared {
    config: ClientConfig,
    pending: PendingRequests,
    session: Mutex<Session>,
    connect_requests: watch::Sender<u64>,
    connected: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
}

/// Client-side command correlator. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Correlator {
    shared: Arc<Shared>,
}

impl Correlator {
    /// Creates a disconnected correlator.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                pending: PendingRequests::new(),
                session: Mutex::new(Session::default()),
                connect_requests: watch::Sender::new(0),
                connected: watch::Sender::new(false),
                shutdown: watch::Sender::new(false),
            }),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Sends `command` with the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`Correlator::send_with_timeout`].
    pub async fn send(&self, command: &str, params: Value) -> Result<Value, CorrelatorError> {
        self.send_with_timeout(command, params, self.shared.config.request_timeout)
            .await
    }

    /// Sends `command` and waits for its reply.
    ///
    /// `params` must be a JSON object (or `null`, treated as `{}`); a
    /// `commandId` field equal to the request id is added to it. The wait
    /// ends after `timeout` without a reply, unless a progress frame for
    /// the request arrives first, in which case the deadline becomes a
    /// sliding window of [`ClientConfig::progress_window`] of silence.
    ///
    /// # Errors
    ///
    /// - [`CorrelatorError::NotConnected`] if the transport is down. A
    ///   connection attempt is triggered as a side effect.
    /// - [`CorrelatorError::NoChannelJoined`] for any command but `join`
    ///   before a channel was joined.
    /// - [`CorrelatorError::InvalidParams`] if `params` is not an object.
    /// - [`CorrelatorError::RequestTimeout`], [`CorrelatorError::ConnectionClosed`],
    ///   [`CorrelatorError::Relay`] or [`CorrelatorError::Command`] when
    ///   the request settles unsuccessfully.
    pub async fn send_with_timeout(
        &self,
        command: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, CorrelatorError> {
        let config = &self.shared.config;
        let rx = {
            let session = self.shared.session.lock().await;
            let Some(outbound) = session.outbound.clone() else {
                self.request_connect();
                return Err(CorrelatorError::NotConnected {
                    url: config.ws_url(),
                });
            };
            let is_join = command == JOIN_COMMAND;
            if !is_join && session.channel.is_none() {
                return Err(CorrelatorError::NoChannelJoined);
            }

            let id = uuid::Uuid::new_v4().to_string();
            let params = with_command_id(params, &id)?;
            let message = CommandMessage {
                id: id.clone(),
                command: command.to_string(),
                params,
            };
            let envelope = if is_join {
                Envelope::Join(JoinEnvelope {
                    id: Some(id.clone()),
                    channel: message
                        .params
                        .get("channel")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    role: Some(config.role.as_str().to_string()),
                    version: Some(config.version.clone()),
                    name: config.name.clone(),
                    message: Some(message),
                })
            } else {
                Envelope::Message(ForwardEnvelope {
                    id: Some(id.clone()),
                    channel: session.channel.clone(),
                    message: serde_json::to_value(&message)?,
                })
            };

            let hint = format!(
                "the executor is probably not connected to the relay; this client uses {} and channel {:?}, check that the executor shows the same server and channel",
                config.ws_url(),
                session.channel.as_deref().unwrap_or("<none>"),
            );
            let rx = self
                .shared
                .pending
                .register(&id, command, timeout, hint)
                .await;
            tracing::info!(request_id = %id, command, "sending command");
            if outbound.send(envelope).is_err() {
                self.shared
                    .pending
                    .resolve(&id, Err(CorrelatorError::ConnectionClosed))
                    .await;
            }
            rx
        };

        rx.await.unwrap_or(Err(CorrelatorError::ConnectionClosed))
    }

    /// Joins `channel`, making it the target of subsequent commands.
    ///
    /// Clears the reconnect suppression left by a `RoleOccupied`
    /// rejection. If the transport is down, waits up to
    /// [`ClientConfig::connect_wait`] for it to come up.
    ///
    /// # Errors
    ///
    /// [`CorrelatorError::NotConnected`] if no connection opened in time,
    /// otherwise whatever the join request settled with.
    pub async fn join(&self, channel: &str) -> Result<(), CorrelatorError> {
        self.shared.session.lock().await.rejected = false;

        if !self.is_connected() {
            self.request_connect();
            let mut connected = self.shared.connected.subscribe();
            let wait = self.shared.config.connect_wait;
            let opened = tokio::time::timeout(wait, connected.wait_for(|up| *up))
                .await
                .is_ok_and(|up| up.is_ok());
            if !opened {
                return Err(CorrelatorError::NotConnected {
                    url: self.shared.config.ws_url(),
                });
            }
        }

        match self.send(JOIN_COMMAND, json!({ "channel": channel })).await {
            Ok(_) => {
                self.shared.session.lock().await.channel = Some(channel.to_string());
                tracing::info!(channel, "joined channel");
                Ok(())
            }
            Err(err) => {
                tracing::error!(channel, error = %err, "failed to join channel");
                Err(err)
            }
        }
    }

    /// Processes one text frame received from the relay.
    pub async fn handle_incoming(&self, text: &str) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(error = %err, "error parsing relay frame");
                return;
            }
        };

        match envelope {
            Envelope::Error(err) => {
                tracing::error!(code = %err.code, message = %err.message, "relay error");
                if err.code == ErrorCode::RoleOccupied {
                    self.shared.session.lock().await.rejected = true;
                }
                if let Some(id) = err.id {
                    let reply = Err(CorrelatorError::Relay {
                        code: err.code,
                        message: err.message,
                    });
                    self.shared.pending.resolve(&id, reply).await;
                }
            }
            Envelope::ProgressUpdate(fwd) => {
                self.on_progress(fwd.id.as_deref(), &fwd.message).await;
            }
            Envelope::Broadcast(broadcast) => match broadcast.kind {
                ForwardKind::ProgressUpdate => {
                    self.on_progress(broadcast.id.as_deref(), &broadcast.message)
                        .await;
                }
                ForwardKind::Message => self.on_reply(broadcast).await,
            },
            Envelope::System(system) => self.on_system(system).await,
            other => tracing::debug!(kind = other.kind(), "ignoring unexpected frame"),
        }
    }

    /// Called by the transport once a socket is open. Returns the queue
    /// the transport must drain into the socket.
    ///
    /// A new connection has not joined anything yet, so the current
    /// channel is cleared.
    pub async fn attach(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut session = self.shared.session.lock().await;
            session.outbound = Some(tx);
            session.channel = None;
            session.peer = None;
        }
        self.shared.connected.send_replace(true);
        rx
    }

    /// Called by the transport once the socket is gone.
    ///
    /// Rejects every pending request with `ConnectionClosed`. Returns
    /// `true` if the transport should reconnect on its own, `false` if
    /// the last relay error was `RoleOccupied` or shutdown was requested.
    pub async fn detach(&self) -> bool {
        let rejected = {
            let mut session = self.shared.session.lock().await;
            session.outbound = None;
            session.peer = None;
            session.rejected
        };
        self.shared.connected.send_replace(false);
        let dropped = self.shared.pending.reject_all().await;
        if dropped > 0 {
            tracing::warn!(dropped, "rejected pending requests: connection closed");
        }
        !rejected && !self.is_shutting_down()
    }

    /// Asks the transport to (re)connect as soon as possible.
    pub fn request_connect(&self) {
        self.shared
            .connect_requests
            .send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Watches connection requests. The value is a counter bumped by
    /// every [`Self::request_connect`].
    #[must_use]
    pub fn subscribe_connect_requests(&self) -> watch::Receiver<u64> {
        self.shared.connect_requests.subscribe()
    }

    /// Stops the transport and disables reconnects.
    pub fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);
    }

    /// Whether [`Self::shutdown`] was called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shared.shutdown.borrow()
    }

    /// Watches the shutdown flag.
    #[must_use]
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shared.shutdown.subscribe()
    }

    /// Whether a socket is currently attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Channel commands are currently sent to.
    pub async fn current_channel(&self) -> Option<String> {
        self.shared.session.lock().await.channel.clone()
    }

    /// Whether reconnects are suppressed by a `RoleOccupied` rejection.
    pub async fn is_rejected(&self) -> bool {
        self.shared.session.lock().await.rejected
    }

    /// The executor last announced by the relay, if still present.
    pub async fn peer(&self) -> Option<PeerInfo> {
        self.shared.session.lock().await.peer.clone()
    }

    /// Most recent version advisory received from the relay.
    pub async fn version_advisory(&self) -> Option<VersionSkew> {
        self.shared.session.lock().await.advisory.clone()
    }

    /// Number of requests awaiting a reply.
    pub async fn pending_count(&self) -> usize {
        self.shared.pending.len().await
    }

    /// Spawns the WebSocket transport supervisor for this correlator.
    pub fn spawn_transport(&self) -> JoinHandle<()> {
        tokio::spawn(super::transport::run(self.clone()))
    }

    async fn on_progress(&self, id: Option<&str>, payload: &Value) {
        let data = payload.get("data");
        let id = id
            .or_else(|| payload.get("id").and_then(Value::as_str))
            .or_else(|| {
                data.and_then(|d| d.get("commandId"))
                    .and_then(Value::as_str)
            });
        let Some(id) = id else {
            tracing::debug!("progress frame without correlation id");
            return;
        };
        if !self
            .shared
            .pending
            .touch(id, self.shared.config.progress_window)
            .await
        {
            tracing::debug!(request_id = id, "progress for unknown request");
            return;
        }

        let field = |name: &str| data.and_then(|d| d.get(name)).cloned().unwrap_or_default();
        let (command, status, progress, message) = (
            field("commandType"),
            field("status"),
            field("progress"),
            field("message"),
        );
        tracing::info!(
            request_id = id,
            command = %command,
            %progress,
            message = %message,
            "progress update"
        );
        if status == "completed" && progress == 100 {
            tracing::info!(request_id = id, command = %command, "operation completed, waiting for final result");
        }
    }

    async fn on_reply(&self, broadcast: BroadcastEnvelope) {
        let payload = broadcast.message;
        let id = payload.get("id").and_then(Value::as_str);
        let settled = match id {
            Some(id) if self.shared.pending.contains(id).await => {
                if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
                    let message = error
                        .as_str()
                        .map_or_else(|| error.to_string(), str::to_string);
                    tracing::error!(request_id = id, error = %message, "error from executor");
                    self.shared
                        .pending
                        .resolve(id, Err(CorrelatorError::Command(message)))
                        .await
                } else if let Some(result) = payload.get("result") {
                    self.shared.pending.resolve(id, Ok(result.clone())).await
                } else {
                    false
                }
            }
            _ => false,
        };
        if !settled {
            tracing::info!(sender = %broadcast.sender, message = %payload, "received broadcast message");
        }
    }

    async fn on_system(&self, system: SystemEnvelope) {
        let channel = system.channel.as_deref().unwrap_or_default();
        match system.code {
            Some(NoticeCode::PeerJoined) => {
                tracing::info!(channel, peer = ?system.peer, "peer joined");
                self.shared.session.lock().await.peer = system.peer;
            }
            Some(NoticeCode::PeerLeft) => {
                tracing::warn!(channel, "peer left");
                self.shared.session.lock().await.peer = None;
            }
            Some(NoticeCode::VersionMismatch) => {
                if let SystemMessage::Text(text) = &system.message {
                    tracing::warn!(channel, "{text}");
                }
                self.shared.session.lock().await.advisory = system.version_mismatch;
            }
            Some(NoticeCode::ChannelReset) => {
                tracing::warn!(channel, "channel was reset by the relay; join again to continue");
                let mut session = self.shared.session.lock().await;
                session.channel = None;
                session.peer = None;
            }
            None => match system.message {
                SystemMessage::Result(result) => {
                    if !self
                        .shared
                        .pending
                        .resolve(&result.id, Ok(result.result))
                        .await
                    {
                        tracing::debug!(request_id = %result.id, "result for unknown request");
                    }
                }
                SystemMessage::Text(text) => tracing::info!(channel, "relay: {text}"),
                SystemMessage::Other(value) => tracing::debug!(%value, "relay notice"),
            },
        }
    }
}

/// Copies `id` into `params.commandId`.
fn with_command_id(params: Value, id: &str) -> Result<Value, CorrelatorError> {
    let mut map = match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(CorrelatorError::InvalidParams),
    };
    map.insert("commandId".to_string(), Value::String(id.to_string()));
    Ok(Value::Object(map))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::RelayError;
    use crate::protocol::Role;

    fn correlator() -> Correlator {
        Correlator::new(ClientConfig {
            connect_wait: Duration::from_millis(10),
            ..ClientConfig::default()
        })
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
        let Some(envelope) = rx.recv().await else {
            panic!("outbound queue closed");
        };
        envelope
    }

    /// Attaches a fake transport and completes a join on `channel`.
    async fn joined(channel: &str) -> (Correlator, mpsc::UnboundedReceiver<Envelope>) {
        let correlator = correlator();
        let mut rx = correlator.attach().await;
        let joiner = {
            let correlator = correlator.clone();
            let channel = channel.to_string();
            tokio::spawn(async move { correlator.join(&channel).await })
        };
        let Envelope::Join(join) = next_frame(&mut rx).await else {
            panic!("expected join frame");
        };
        let Some(id) = join.id.clone() else {
            panic!("join carries id");
        };
        let ack = Envelope::system_result(Some(channel), &id, json!("Connected"));
        correlator
            .handle_incoming(&serde_json::to_string(&ack).unwrap_or_default())
            .await;
        let Ok(result) = joiner.await else {
            panic!("join task panicked");
        };
        assert_ok!(result);
        (correlator, rx)
    }

    fn command_id(envelope: &Envelope) -> String {
        let Envelope::Message(fwd) = envelope else {
            panic!("expected message frame");
        };
        let Some(id) = fwd.message.get("id").and_then(Value::as_str) else {
            panic!("message carries id");
        };
        id.to_string()
    }

    fn reply_frame(channel: &str, message: Value) -> String {
        serde_json::to_string(&Envelope::Broadcast(BroadcastEnvelope {
            channel: channel.to_string(),
            sender: Role::Executor,
            kind: ForwardKind::Message,
            id: None,
            message,
        }))
        .unwrap_or_default()
    }

    #[tokio::test]
    async fn send_without_transport_is_not_connected() {
        let correlator = correlator();
        let result = correlator.send("ping", json!({})).await;
        assert!(matches!(result, Err(CorrelatorError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn send_before_join_needs_channel() {
        let correlator = correlator();
        let _rx = correlator.attach().await;
        let result = correlator.send("ping", json!({})).await;
        assert!(matches!(result, Err(CorrelatorError::NoChannelJoined)));
        assert_eq!(correlator.pending_count().await, 0);
    }

    #[tokio::test]
    async fn join_frame_carries_identity_and_command_id() {
        let correlator = correlator();
        let mut rx = correlator.attach().await;
        let task = {
            let correlator = correlator.clone();
            tokio::spawn(async move { correlator.join("design-1").await })
        };
        let Envelope::Join(join) = next_frame(&mut rx).await else {
            panic!("expected join frame");
        };
        assert_eq!(join.channel.as_deref(), Some("design-1"));
        assert_eq!(join.role.as_deref(), Some("client"));
        let Some(message) = &join.message else {
            panic!("join embeds command");
        };
        assert_eq!(message.command, "join");
        assert_eq!(message.params["commandId"], json!(message.id));
        assert_eq!(join.id.as_deref(), Some(message.id.as_str()));
        task.abort();
    }

    #[tokio::test]
    async fn reply_resolves_matching_request() {
        let (correlator, mut rx) = joined("design-1").await;
        let task = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .send("get_node_info", json!({"nodeId": "1:2"}))
                    .await
            })
        };
        let frame = next_frame(&mut rx).await;
        let id = command_id(&frame);
        let Envelope::Message(fwd) = &frame else {
            panic!("expected message frame");
        };
        assert_eq!(fwd.channel.as_deref(), Some("design-1"));
        assert_eq!(fwd.message["params"]["nodeId"], "1:2");
        assert_eq!(fwd.message["params"]["commandId"], json!(id));

        // Replies to unknown ids are ignored.
        correlator
            .handle_incoming(&reply_frame("design-1", json!({"id": "other", "result": 1})))
            .await;
        assert_eq!(correlator.pending_count().await, 1);

        correlator
            .handle_incoming(&reply_frame(
                "design-1",
                json!({"id": id, "result": {"name": "Frame 1"}}),
            ))
            .await;
        let Ok(result) = task.await else {
            panic!("send task panicked");
        };
        let value = assert_ok!(result);
        assert_eq!(value["name"], "Frame 1");
        assert_eq!(correlator.pending_count().await, 0);
    }

    #[tokio::test]
    async fn executor_error_rejects_request() {
        let (correlator, mut rx) = joined("c").await;
        let task = {
            let correlator = correlator.clone();
            tokio::spawn(async move { correlator.send("delete_node", json!({})).await })
        };
        let id = command_id(&next_frame(&mut rx).await);
        correlator
            .handle_incoming(&reply_frame("c", json!({"id": id, "error": "node not found"})))
            .await;
        let Ok(result) = task.await else {
            panic!("send task panicked");
        };
        let err = assert_err!(result);
        assert!(matches!(err, CorrelatorError::Command(ref m) if m == "node not found"));
    }

    #[tokio::test]
    async fn close_rejects_all_pending_and_schedules_reconnect() {
        let (correlator, mut rx) = joined("c").await;
        let mut tasks = Vec::new();
        for command in ["a", "b"] {
            let correlator = correlator.clone();
            tasks.push(tokio::spawn(async move {
                correlator.send(command, json!({})).await
            }));
            let _ = next_frame(&mut rx).await;
        }
        assert_eq!(correlator.pending_count().await, 2);

        assert!(correlator.detach().await);
        for task in tasks {
            let Ok(result) = task.await else {
                panic!("send task panicked");
            };
            assert!(matches!(result, Err(CorrelatorError::ConnectionClosed)));
        }
        assert_eq!(correlator.pending_count().await, 0);
    }

    #[tokio::test]
    async fn role_occupied_suppresses_reconnect_until_join() {
        let correlator = correlator();
        let mut rx = correlator.attach().await;
        let task = {
            let correlator = correlator.clone();
            tokio::spawn(async move { correlator.join("c").await })
        };
        let Envelope::Join(join) = next_frame(&mut rx).await else {
            panic!("expected join frame");
        };
        let err = RelayError::RoleOccupied {
            channel: "c".to_string(),
            role: Role::Client,
        };
        let frame = Envelope::error(join.id.as_deref(), Some("c"), &err);
        correlator
            .handle_incoming(&serde_json::to_string(&frame).unwrap_or_default())
            .await;

        let Ok(result) = task.await else {
            panic!("join task panicked");
        };
        let err = assert_err!(result);
        assert!(err.is_role_occupied());
        assert!(correlator.is_rejected().await);
        assert!(correlator.current_channel().await.is_none());

        assert!(!correlator.detach().await);

        // An explicit join clears the suppression even if it cannot connect.
        let mut requests = correlator.subscribe_connect_requests();
        requests.borrow_and_update();
        let retry = correlator.join("c").await;
        assert!(matches!(requests.has_changed(), Ok(true)));
        assert!(matches!(retry, Err(CorrelatorError::NotConnected { .. })));
        assert!(!correlator.is_rejected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_frames_keep_request_alive() {
        let (correlator, mut rx) = joined("c").await;
        let task = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .send_with_timeout("scan_text_nodes", json!({}), Duration::from_secs(30))
                    .await
            })
        };
        let id = command_id(&next_frame(&mut rx).await);

        for step in 1..=3 {
            tokio::time::sleep(Duration::from_secs(20)).await;
            let progress = Envelope::Broadcast(BroadcastEnvelope {
                channel: "c".to_string(),
                sender: Role::Executor,
                kind: ForwardKind::ProgressUpdate,
                id: None,
                message: json!({
                    "type": "command_progress",
                    "data": {
                        "commandId": id,
                        "commandType": "scan_text_nodes",
                        "status": "in_progress",
                        "progress": step * 30,
                        "message": "scanning"
                    }
                }),
            });
            correlator
                .handle_incoming(&serde_json::to_string(&progress).unwrap_or_default())
                .await;
        }
        assert!(!task.is_finished());

        let Ok(result) = task.await else {
            panic!("send task panicked");
        };
        let Err(CorrelatorError::RequestTimeout { after, .. }) = result else {
            panic!("expected timeout");
        };
        assert_eq!(after, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn peer_notices_update_view() {
        let (correlator, _rx) = joined("c").await;
        let peer = PeerInfo {
            role: Role::Executor,
            version: Some("1.1.0".to_string()),
            name: None,
            joined_at: chrono::Utc::now(),
        };
        let frame = Envelope::peer_joined("c", peer);
        correlator
            .handle_incoming(&serde_json::to_string(&frame).unwrap_or_default())
            .await;
        assert_eq!(
            correlator.peer().await.map(|p| p.role),
            Some(Role::Executor)
        );

        let Some(skew) = VersionSkew::detect(Some("1.2.0"), Some("1.1.0")) else {
            panic!("expected skew");
        };
        let frame = Envelope::version_mismatch("c", skew, Role::Client);
        correlator
            .handle_incoming(&serde_json::to_string(&frame).unwrap_or_default())
            .await;
        let Some(advisory) = correlator.version_advisory().await else {
            panic!("advisory kept");
        };
        assert_eq!(advisory.expected, "1.2.0");

        let frame = Envelope::channel_reset("c");
        correlator
            .handle_incoming(&serde_json::to_string(&frame).unwrap_or_default())
            .await;
        assert!(correlator.current_channel().await.is_none());
    }

    #[test]
    fn params_must_be_an_object() {
        assert!(matches!(
            with_command_id(json!([1, 2]), "x"),
            Err(CorrelatorError::InvalidParams)
        ));
        let Ok(params) = with_command_id(Value::Null, "x") else {
            panic!("null is accepted");
        };
        assert_eq!(params, json!({"commandId": "x"}));
    }
}
