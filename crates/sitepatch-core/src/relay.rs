//! Streaming relay for initial generation.
//!
//! A pump task decodes the transport body and pushes content deltas through
//! a bounded channel; the caller's task drains the channel into the sink.
//! The sink is shut down exactly once whichever way the relay ends.

use crate::sse::content_deltas;
use crate::{Error, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default channel capacity between pump and writer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// How a relay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    /// The transport finished or sent `[DONE]`.
    Completed,
    /// A transport or decode failure was reported inside the stream.
    Failed(String),
    /// The caller cancelled.
    Cancelled,
    /// Writing to the sink failed.
    SinkClosed,
}

/// Summary of one relay run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub status: RelayStatus,
    /// Content bytes forwarded, excluding any error payload.
    pub bytes_written: u64,
}

impl RelayOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RelayStatus::Completed
    }

    /// Converts the outcome into the number of bytes written or an error.
    pub fn into_result(self) -> Result<u64> {
        match self.status {
            RelayStatus::Completed => Ok(self.bytes_written),
            RelayStatus::Cancelled => Err(Error::Cancelled),
            RelayStatus::Failed(message) => Err(Error::Provider(message)),
            RelayStatus::SinkClosed => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "output closed during relay",
            ))),
        }
    }
}

/// Forwards content deltas from a transport body to an async sink.
#[derive(Debug, Clone, Copy)]
pub struct Relay {
    capacity: usize,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Relay {
    /// Creates a relay with the given channel capacity (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Runs the relay to completion.
    ///
    /// Deltas are written unmodified and flushed as they arrive. A transport
    /// failure is written as `{"ok":false,"message":...}` rather than
    /// returned. Output already written is never retracted.
    pub async fn run<S, W>(&self, body: S, sink: &mut W, cancel: CancellationToken) -> RelayOutcome
    where
        S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let (tx, mut rx) = mpsc::channel::<Result<String>>(self.capacity);
        let pump_token = cancel.child_token();
        let pump = tokio::spawn(pump(body, tx, pump_token.clone()));

        let mut bytes_written = 0u64;
        let status = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break RelayStatus::Cancelled,
                next = rx.recv() => next,
            };
            match next {
                None => break RelayStatus::Completed,
                Some(Ok(delta)) => {
                    if let Err(err) = write_delta(sink, delta.as_bytes()).await {
                        debug!(error = %err, "sink rejected write, stopping relay");
                        break RelayStatus::SinkClosed;
                    }
                    bytes_written += delta.len() as u64;
                },
                Some(Err(err)) => {
                    let message = err.to_string();
                    warn!(error = %message, "model stream failed");
                    let payload = failure_payload(&message);
                    if let Err(write_err) = write_delta(sink, &payload).await {
                        debug!(error = %write_err, "could not report stream failure");
                    }
                    break RelayStatus::Failed(message);
                },
            }
        };

        pump_token.cancel();
        drop(rx);
        if let Err(err) = pump.await {
            warn!(error = %err, "relay pump task panicked");
        }
        if let Err(err) = sink.shutdown().await {
            debug!(error = %err, "sink shutdown failed");
        }

        info!(?status, bytes_written, "relay finished");
        RelayOutcome {
            status,
            bytes_written,
        }
    }
}

async fn pump<S>(body: S, tx: mpsc::Sender<Result<String>>, cancel: CancellationToken)
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let mut deltas = std::pin::pin!(content_deltas(body));
    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            item = deltas.next() => item,
        };
        let Some(item) = item else { return };
        let failed = item.is_err();
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            sent = tx.send(item) => {
                if sent.is_err() {
                    return;
                }
            },
        }
        if failed {
            return;
        }
    }
}

async fn write_delta<W>(sink: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(bytes).await?;
    sink.flush().await
}

/// In-band error object written when the stream fails mid-flight.
pub fn failure_payload(message: &str) -> Vec<u8> {
    serde_json::json!({ "ok": false, "message": message })
        .to_string()
        .into_bytes()
}
