use axum::body::Bytes;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::protocol::StreamEvent;

/// Outbound side of one client stream.
///
/// `flush` is called after every frame; implementations that cannot buffer
/// may treat it as a no-op.
pub trait Connection: Send {
    fn write(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send;
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to encode frame payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write frame: {0}")]
    Io(#[from] io::Error),
}

/// Serializes `event: <name>\ndata: <json>\n\n`.
pub fn encode_frame<T: Serialize + ?Sized>(name: &str, payload: &T) -> Result<Bytes, FrameError> {
    let data = serde_json::to_string(payload)?;
    let mut frame = String::with_capacity(name.len() + data.len() + 15);
    frame.push_str("event: ");
    frame.push_str(name);
    frame.push_str("\ndata: ");
    frame.push_str(&data);
    frame.push_str("\n\n");
    Ok(Bytes::from(frame))
}

/// Writes frames one at a time and flushes each before returning.
///
/// Failures never leave this type. A payload that cannot be encoded is
/// dropped; the first I/O error marks the connection closed and every later
/// write becomes a no-op.
pub struct FrameWriter<C> {
    conn: C,
    closed: bool,
}

impl<C: Connection> FrameWriter<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    pub async fn write(&mut self, event: &StreamEvent<'_>) {
        self.write_event(event.name(), event).await;
    }

    pub async fn write_event<T: Serialize + ?Sized>(&mut self, name: &str, payload: &T) {
        if self.closed {
            return;
        }

        match self.try_write(name, payload).await {
            Ok(()) => {}
            Err(FrameError::Encode(err)) => {
                tracing::debug!(event = name, error = %err, "dropping unencodable frame");
            }
            Err(FrameError::Io(err)) => {
                tracing::debug!(event = name, error = %err, "connection lost, dropping remaining frames");
                self.closed = true;
            }
        }
    }

    async fn try_write<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        payload: &T,
    ) -> Result<(), FrameError> {
        let frame = encode_frame(name, payload)?;
        self.conn.write(frame).await?;
        self.conn.flush().await?;
        Ok(())
    }
}

/// A connection over any async byte sink.
pub struct WriterConnection<W> {
    inner: W,
}

impl<W> WriterConnection<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin + Send> Connection for WriterConnection<W> {
    async fn write(&mut self, frame: Bytes) -> io::Result<()> {
        self.inner.write_all(&frame).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}

/// Feeds an HTTP response body. Every frame becomes its own body chunk, so
/// there is nothing left to flush once `write` returns.
pub struct ChannelConnection {
    tx: mpsc::Sender<Result<Bytes, Infallible>>,
}

impl ChannelConnection {
    pub fn new(capacity: usize) -> (Self, ReceiverStream<Result<Bytes, Infallible>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, ReceiverStream::new(rx))
    }
}

impl Connection for ChannelConnection {
    async fn write(&mut self, frame: Bytes) -> io::Result<()> {
        self.tx
            .send(Ok(frame))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stream body dropped"))
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
