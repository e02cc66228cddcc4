//! WebSocket-backed [`GraphExecutorFactory`], grounded on the teacher's
//! `client/client.rs` `AcoClient` — same shape (a URL, a mutex-guarded
//! `WebSocketStream`, connect-on-first-use), pointed at the upstream graph
//! executor service instead of the aco tool-execution server (spec.md
//! §6.4). The wire protocol below is this crate's own: the contract only
//! specifies the Rust-level trait, not bytes on the wire, so a minimal
//! newline-delimited JSON envelope stands in for whatever the real
//! upstream service speaks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{GraphError, GraphExecutor, GraphExecutorFactory, GraphRunConfig, GraphState};
use crate::domain::graph_chunk::GraphChunk;
use crate::error::{OrchestratorError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Request<'a> {
    Stream { thread_id: &'a str, initial_state: Option<serde_json::Value> },
    GetState { thread_id: &'a str },
    UpdateState { thread_id: &'a str, patch: serde_json::Value },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Response {
    Chunk { chunk: GraphChunk },
    StreamDone,
    State { values: serde_json::Value, next: Vec<String> },
    Ack,
    Error { transient: bool, message: String },
}

/// Connects to the configured upstream graph executor, compiling a fresh
/// executor handle per workflow thread.
pub struct WsGraphExecutorFactory {
    url: String,
}

impl WsGraphExecutorFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GraphExecutorFactory for WsGraphExecutorFactory {
    async fn build_graph(&self, interrupt_before: &[String]) -> Result<Box<dyn GraphExecutor>> {
        let (stream, _) = connect_async(&self.url)
            .await
            .map_err(|err| OrchestratorError::Internal(format!("graph executor connect failed: {err}")))?;

        let executor = WsGraphExecutor {
            connection: Mutex::new(stream),
            interrupt_before: interrupt_before.to_vec(),
        };
        Ok(Box::new(executor) as Box<dyn GraphExecutor>)
    }
}

/// One compiled graph handle, bound to a single upstream connection.
/// `interrupt_before` is carried for diagnostics only — the upstream
/// service is the one that actually pauses before those nodes.
struct WsGraphExecutor {
    connection: Mutex<WsStream>,
    #[allow(dead_code)]
    interrupt_before: Vec<String>,
}

impl WsGraphExecutor {
    async fn send(&self, conn: &mut WsStream, request: &Request<'_>) -> Result<()> {
        let payload = serde_json::to_string(request)
            .map_err(|err| OrchestratorError::Internal(format!("graph request encode failed: {err}")))?;
        conn.send(Message::Text(payload))
            .await
            .map_err(|err| OrchestratorError::Internal(format!("graph executor send failed: {err}")))?;
        Ok(())
    }

    async fn recv(&self, conn: &mut WsStream) -> std::result::Result<Response, GraphError> {
        loop {
            match conn.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).map_err(|err| {
                        GraphError::Permanent(format!("malformed graph executor response: {err}"))
                    });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(other)) => {
                    return Err(GraphError::Permanent(format!("unexpected frame: {other:?}")));
                }
                Some(Err(err)) => {
                    return Err(GraphError::Transient {
                        cause: super::TransientCause::ConnectionReset,
                        message: err.to_string(),
                    });
                }
                None => {
                    return Err(GraphError::Transient {
                        cause: super::TransientCause::ConnectionReset,
                        message: "graph executor connection closed".into(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl GraphExecutor for WsGraphExecutor {
    async fn stream(
        &self,
        initial_state: Option<serde_json::Value>,
        config: &GraphRunConfig,
    ) -> Result<BoxStream<'static, std::result::Result<GraphChunk, GraphError>>> {
        let mut conn = self.connection.lock().await;
        self.send(&mut conn, &Request::Stream { thread_id: &config.thread_id, initial_state }).await?;

        let mut chunks = Vec::new();
        loop {
            match self.recv(&mut conn).await {
                Ok(Response::Chunk { chunk }) => chunks.push(Ok(chunk)),
                Ok(Response::StreamDone) => break,
                Ok(Response::Error { transient, message }) => {
                    chunks.push(Err(if transient {
                        GraphError::Transient { cause: super::TransientCause::Timeout, message }
                    } else {
                        GraphError::Permanent(message)
                    }));
                    break;
                }
                Ok(_) => return Err(OrchestratorError::Internal("unexpected response to stream request".into())),
                Err(err) => {
                    chunks.push(Err(err));
                    break;
                }
            }
        }

        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn get_state(&self, config: &GraphRunConfig) -> Result<GraphState> {
        let mut conn = self.connection.lock().await;
        self.send(&mut conn, &Request::GetState { thread_id: &config.thread_id }).await?;
        match self.recv(&mut conn).await {
            Ok(Response::State { values, next }) => Ok(GraphState { values, next }),
            Ok(_) => Err(OrchestratorError::Internal("unexpected response to get_state request".into())),
            Err(err) => Err(OrchestratorError::Internal(err.to_string())),
        }
    }

    async fn update_state(&self, config: &GraphRunConfig, patch: serde_json::Value) -> Result<()> {
        let mut conn = self.connection.lock().await;
        self.send(&mut conn, &Request::UpdateState { thread_id: &config.thread_id, patch }).await?;
        match self.recv(&mut conn).await {
            Ok(Response::Ack) => Ok(()),
            Ok(_) => Err(OrchestratorError::Internal("unexpected response to update_state request".into())),
            Err(err) => Err(OrchestratorError::Internal(err.to_string())),
        }
    }
}
