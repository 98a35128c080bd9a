use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use futures::{Sink, SinkExt, StreamExt};
use shared::protocol::{ClientRequest, ServerEvent};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::synchronizer::{ConnectionStatus, Synchronizer};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid server url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("server url must use http, https, ws or wss, got {0}")]
    UnsupportedScheme(String),
}

pub fn websocket_url(server_url: &str, ws_path: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(server_url).map_err(|source| EndpointError::InvalidUrl {
        url: server_url.to_string(),
        source,
    })?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|()| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;
    url.set_path(ws_path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ConnectionChanged(ConnectionStatus),
    Server(ServerEvent),
    Error(String),
}

struct ActiveConnection {
    id: u64,
    outbound: mpsc::UnboundedSender<ClientRequest>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

#[derive(Default)]
struct StreamState {
    connection: Option<ActiveConnection>,
    next_connection_id: u64,
    visibility: Visibility,
    config_requested: bool,
}

impl StreamState {
    fn send(&self, request: ClientRequest) {
        let Some(connection) = &self.connection else {
            debug!(request = request.name(), "stream: not connected, request dropped");
            return;
        };
        if connection.outbound.send(request).is_err() {
            debug!(request = request.name(), "stream: writer gone, request dropped");
        }
    }
}

pub struct EventStreamClient {
    ws_url: Url,
    synchronizer: Arc<Synchronizer>,
    inner: Mutex<StreamState>,
    events: broadcast::Sender<ClientEvent>,
}

impl fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("ws_url", &self.ws_url.as_str())
            .finish_non_exhaustive()
    }
}

impl EventStreamClient {
    pub fn new(ws_url: Url, synchronizer: Arc<Synchronizer>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            ws_url,
            synchronizer,
            inner: Mutex::new(StreamState::default()),
            events,
        })
    }

    pub fn ws_url(&self) -> &Url {
        &self.ws_url
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.connection.is_some()
    }

    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.connection.is_some() {
            return Ok(());
        }

        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {}", self.ws_url))?;
        let (ws_writer, mut ws_reader) = ws_stream.split();

        guard.next_connection_id += 1;
        let id = guard.next_connection_id;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_requests(ws_writer, outbound_rx));

        let client = Arc::clone(self);
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = ws_reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => client.dispatch(&text),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "stream: websocket receive failed");
                        let _ = client
                            .events
                            .send(ClientEvent::Error(format!("websocket receive failed: {err}")));
                        break;
                    }
                }
            }
            client.connection_lost(id).await;
        });

        guard.connection = Some(ActiveConnection {
            id,
            outbound,
            reader_task,
            writer_task,
        });
        if !guard.config_requested {
            guard.config_requested = true;
            guard.send(ClientRequest::RequestConfig);
        }
        if guard.visibility == Visibility::Visible {
            guard.send(ClientRequest::StartDetection);
        }
        // Published under the lock so a fast channel loss cannot be reported first.
        info!(url = %self.ws_url, "stream: connected");
        self.publish_connection(ConnectionStatus::Active);
        Ok(())
    }

    pub async fn set_visibility(&self, visibility: Visibility) {
        let mut guard = self.inner.lock().await;
        if guard.visibility == visibility {
            return;
        }
        guard.visibility = visibility;
        info!(?visibility, "stream: display visibility changed");
        guard.send(match visibility {
            Visibility::Visible => ClientRequest::StartDetection,
            Visibility::Hidden => ClientRequest::StopDetection,
        });
    }

    pub async fn shutdown(&self) {
        let connection = {
            let mut guard = self.inner.lock().await;
            guard.send(ClientRequest::StopDetection);
            guard.connection.take()
        };
        let Some(connection) = connection else {
            return;
        };

        connection.reader_task.abort();
        // Dropping the last sender lets the writer flush the stop request and close.
        drop(connection.outbound);
        if let Err(err) = connection.writer_task.await {
            debug!(error = %err, "stream: writer task ended abnormally");
        }

        info!("stream: closed");
        self.publish_connection(ConnectionStatus::Disconnected);
    }

    fn dispatch(&self, text: &str) {
        match ServerEvent::decode(text) {
            Ok(event) => {
                debug!(event = event.name(), "stream: event received");
                self.synchronizer.handle_server_event(event.clone());
                let _ = self.events.send(ClientEvent::Server(event));
            }
            Err(err) => {
                warn!(error = %err, "stream: ignoring undecodable frame");
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("invalid server event: {err}")));
            }
        }
    }

    async fn connection_lost(&self, id: u64) {
        let connection = {
            let mut guard = self.inner.lock().await;
            if guard.connection.as_ref().map(|connection| connection.id) != Some(id) {
                return;
            }
            guard.connection.take()
        };
        // The peer is gone, so there is nobody left to receive a stop request.
        if let Some(connection) = connection {
            connection.writer_task.abort();
        }

        warn!(url = %self.ws_url, "stream: channel lost");
        self.publish_connection(ConnectionStatus::Disconnected);
    }

    fn publish_connection(&self, status: ConnectionStatus) {
        self.synchronizer.set_connection_status(status);
        let _ = self.events.send(ClientEvent::ConnectionChanged(status));
    }
}

async fn write_requests<S>(mut sink: S, mut requests: mpsc::UnboundedReceiver<ClientRequest>)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(request) = requests.recv().await {
        let text = match serde_json::to_string(&request) {
            Ok(text) => text,
            Err(err) => {
                warn!(request = request.name(), error = %err, "stream: request not serializable");
                continue;
            }
        };
        if let Err(err) = sink.send(Message::Text(text)).await {
            warn!(request = request.name(), error = %err, "stream: request not delivered");
            return;
        }
        debug!(request = request.name(), "stream: request sent");
    }
    let _ = sink.close().await;
}

#[cfg(test)]
#[path = "tests/event_stream_tests.rs"]
mod tests;
