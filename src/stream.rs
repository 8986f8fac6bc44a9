//! Timed, chunked emission of a response body.

use std::{future::Future, io, time::Duration};

use bytes::Bytes;
use log::trace;
use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{params::ResolvedParameters, random};

const LOG_TARGET: &str = "trickle::stream";

/// Largest single write handed to a sink. Chunks bigger than this go out as
/// several writes followed by one flush.
pub const MAX_PIECE: u64 = 64 * 1024;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("sink error: {0}")]
    Sink(#[from] io::Error),
}

/// How a response body is cut up in time and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    length: u64,
    unit: u64,
    chunk_count: u64,
    delay: Duration,
}

impl ChunkPlan {
    pub fn new(params: &ResolvedParameters) -> Self {
        let length = u64::try_from(params.length).unwrap_or(0);
        let unit = u64::try_from(params.unit).unwrap_or(1).max(1);
        let chunk_count = length.div_ceil(unit);

        let delay = if chunk_count == 0 {
            Duration::ZERO
        } else {
            // Integer division; a zero result means back-to-back chunks.
            let total_millis = params.duration.saturating_mul(1000);
            let millis = total_millis / i64::try_from(chunk_count).unwrap_or(i64::MAX);
            Duration::from_millis(u64::try_from(millis).unwrap_or(0))
        };

        Self {
            length,
            unit,
            chunk_count,
            delay,
        }
    }

    /// Value announced in the `Content-Length` header.
    pub fn content_length(&self) -> u64 {
        self.length
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Pause taken before every chunk.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Size of chunk `index`: `min(length - unit * index, unit)`.
    pub fn chunk_size(&self, index: u64) -> u64 {
        self.length.saturating_sub(self.unit.saturating_mul(index)).min(self.unit)
    }

    pub fn chunk_sizes(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.chunk_count).map(|i| self.chunk_size(i))
    }
}

/// Destination for response chunks.
///
/// Writes may buffer; `flush` pushes everything written so far towards the
/// client. Sinks that deliver eagerly can make `flush` a no-op.
pub trait ChunkSink {
    fn write(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Resolves once the other end has gone away. Sinks that cannot tell
    /// never resolve.
    fn closed(&self) -> impl Future<Output = ()> + Send {
        std::future::pending()
    }
}

/// Sink feeding an HTTP response body through a single-slot channel.
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

/// Receiving half of a [`ChannelSink`], turned into a response body by the
/// handler.
pub type ChannelSource = mpsc::Receiver<io::Result<Bytes>>;

impl ChannelSink {
    pub fn pair() -> (Self, ChannelSource) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Ends the body with an error so the connection is torn down instead of
    /// completing normally.
    pub async fn abort(self, err: io::Error) {
        let _ = self.tx.send(Err(err)).await;
    }
}

fn receiver_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "response body receiver dropped")
}

impl ChunkSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx.send(Ok(chunk)).await.map_err(|_| receiver_gone())
    }

    async fn flush(&mut self) -> io::Result<()> {
        // The slot frees up once the connection has taken the last chunk.
        self.tx.reserve().await.map(drop).map_err(|_| receiver_gone())
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Emits the planned chunks into `sink`, sleeping before each one.
///
/// Returns the number of body bytes written. The first failed write or flush
/// ends the stream, as does the sink closing during a pause; nothing is
/// retried.
pub async fn stream<S, R>(plan: &ChunkPlan, sink: &mut S, rng: &mut R) -> Result<u64, StreamError>
where
    S: ChunkSink,
    R: Rng + ?Sized,
{
    let mut written = 0;
    for (index, size) in plan.chunk_sizes().enumerate() {
        if !plan.delay().is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(plan.delay()) => {},
                _ = sink.closed() => return Err(receiver_gone().into()),
            }
        }
        let mut remaining = size;
        while remaining > 0 {
            let piece = remaining.min(MAX_PIECE);
            sink.write(random::alphanumeric(rng, piece as usize)).await?;
            remaining -= piece;
            written += piece;
        }
        sink.flush().await?;
        trace!(target: LOG_TARGET, "chunk {}/{}: {} bytes", index + 1, plan.chunk_count(), size);
    }
    Ok(written)
}
