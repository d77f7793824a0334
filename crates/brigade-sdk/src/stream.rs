//! Typed server-sent event streams.
//!
//! An [`EventStream`] delivers everything that happens on one push channel as
//! a single ordered sequence of [`StreamEvent`]s. A background task owns the
//! connection, reconnects after drops, and stops after the first terminal
//! event (`Done`, `Closed` or `Error`).

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::transport::{ConnectError, StreamTarget, StreamTransport};

/// Reconnect delay used until the server sends a `retry` field.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// One notification from an event stream.
#[derive(Debug)]
pub enum StreamEvent<T> {
    /// A decoded `message` frame.
    Data(T),
    /// The connection dropped and a new attempt is starting.
    Reconnecting,
    /// The server closed the stream without an error. Terminal.
    Closed,
    /// The stream failed. Terminal.
    Error(Error),
    /// The server signalled logical completion. Terminal.
    Done,
}

impl<T> StreamEvent<T> {
    /// True for events after which nothing else is delivered.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Closed | StreamEvent::Error(_) | StreamEvent::Done
        )
    }
}

/// A single-consumer stream of typed events.
///
/// Also usable as a [`futures::Stream`].
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<StreamEvent<T>>,
    task: JoinHandle<()>,
    closed: bool,
}

impl<T> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Start driving `target` over `transport`. Requires a Tokio runtime.
    pub(crate) fn open(
        transport: Arc<dyn StreamTransport>,
        target: StreamTarget,
        retry_delay: Duration,
    ) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Config("event streams require a Tokio runtime".to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = handle.spawn(drive(transport, target, retry_delay, tx));
        Ok(Self {
            rx,
            task,
            closed: false,
        })
    }
}

impl<T> EventStream<T> {
    /// Wait for the next event. Returns `None` once the stream is finished or closed.
    pub async fn recv(&mut self) -> Option<StreamEvent<T>> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Tear down the connection. Idempotent; no further events are delivered.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.task.abort();
        self.rx.close();
    }

    /// True after [`close`](Self::close).
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T> Stream for EventStream<T> {
    type Item = StreamEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// What ended one connection.
enum Outcome {
    /// A terminal event was delivered, or the consumer went away.
    Finished,
    /// The connection dropped; try again.
    Dropped,
}

/// Connection loop. Returns after the first terminal event.
async fn drive<T: DeserializeOwned>(
    transport: Arc<dyn StreamTransport>,
    mut target: StreamTarget,
    mut retry_delay: Duration,
    tx: mpsc::UnboundedSender<StreamEvent<T>>,
) {
    loop {
        tracing::debug!(url = %target.url, "Connecting event stream");
        match transport.connect(&target).await {
            Ok(frames) => {
                tracing::debug!(url = %target.url, "Event stream open");
                if let Outcome::Finished =
                    pump(frames, &mut target, &mut retry_delay, &tx).await
                {
                    return;
                }
            }
            Err(ConnectError::Status(status)) => {
                let _ = tx.send(StreamEvent::Error(Error::StreamStatus { status }));
                return;
            }
            Err(ConnectError::Closed) => {
                let _ = tx.send(StreamEvent::Closed);
                return;
            }
            Err(ConnectError::Transport(reason)) => {
                tracing::warn!(url = %target.url, error = %reason, "Event stream connection failed");
            }
        }

        if tx.send(StreamEvent::Reconnecting).is_err() {
            return;
        }
        tokio::time::sleep(retry_delay).await;
    }
}

/// Deliver frames from one connection until it ends.
async fn pump<T: DeserializeOwned>(
    mut frames: crate::transport::FrameStream,
    target: &mut StreamTarget,
    retry_delay: &mut Duration,
    tx: &mpsc::UnboundedSender<StreamEvent<T>>,
) -> Outcome {
    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(reason) => {
                tracing::warn!(url = %target.url, error = %reason, "Event stream dropped");
                return Outcome::Dropped;
            }
        };

        if !frame.id.is_empty() {
            target.last_event_id = Some(frame.id.clone());
        }
        if let Some(retry) = frame.retry {
            *retry_delay = retry;
        }

        let event = match frame.event.as_str() {
            "message" | "" => {
                if frame.data.is_empty() {
                    continue;
                }
                match serde_json::from_str::<T>(&frame.data) {
                    Ok(data) => StreamEvent::Data(data),
                    Err(e) => {
                        tracing::warn!(data = %frame.data, error = %e, "Failed to parse stream event");
                        StreamEvent::Error(Error::Json(e))
                    }
                }
            }
            "done" => StreamEvent::Done,
            "error" => StreamEvent::Error(Error::Stream(if frame.data.is_empty() {
                "encountered unknown error receiving stream".to_string()
            } else {
                frame.data
            })),
            other => {
                tracing::trace!(event = other, "Ignoring unrecognized stream event");
                continue;
            }
        };

        let terminal = event.is_terminal();
        if tx.send(event).is_err() || terminal {
            return Outcome::Finished;
        }
    }

    tracing::debug!(url = %target.url, "Event stream ended without completion");
    Outcome::Dropped
}
