//! Framed sender
//!
//! Writes complete protocol lines to a connected stream. A single write call
//! may transmit fewer bytes than asked for, so [`send`] loops until the whole
//! buffer has gone out. A write that returns zero bytes or fails is treated
//! as connection loss; nothing is retried across calls.

use crate::{Error, Result};
use std::fmt::{self, Write as _};
use std::future::Future;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

/// Capacity of the line buffer used by [`send_fmt`]
pub const LINE_CAPACITY: usize = 512;

/// Outcome of a formatted send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReport {
    /// The whole rendered line was sent
    Complete(usize),
    /// The rendered line exceeded the buffer capacity and only `sent` bytes went out
    Truncated { sent: usize, rendered: usize },
}

impl SendReport {
    /// Number of bytes written to the stream
    pub fn bytes_sent(&self) -> usize {
        match *self {
            SendReport::Complete(sent) => sent,
            SendReport::Truncated { sent, .. } => sent,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, SendReport::Truncated { .. })
    }

    /// Turn a truncated send into [`Error::Truncated`]
    pub fn strict(self) -> Result<usize> {
        match self {
            SendReport::Complete(sent) => Ok(sent),
            SendReport::Truncated { sent, rendered } => Err(Error::Truncated {
                rendered,
                capacity: sent,
            }),
        }
    }
}

/// A protocol line rendered into a bounded buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    bytes: Vec<u8>,
    rendered: usize,
}

impl RenderedLine {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the line before it was clamped
    pub fn rendered_len(&self) -> usize {
        self.rendered
    }

    pub fn is_truncated(&self) -> bool {
        self.rendered > self.bytes.len()
    }

    fn report(&self, sent: usize) -> SendReport {
        if self.is_truncated() {
            SendReport::Truncated {
                sent,
                rendered: self.rendered,
            }
        } else {
            SendReport::Complete(sent)
        }
    }
}

/// Render `args` into a buffer of at most `capacity` bytes.
///
/// An oversized line is clamped to `capacity`. If the line was newline
/// terminated, the last byte of the clamped buffer is replaced with the
/// newline so the stream stays framed.
pub fn render(args: fmt::Arguments<'_>, capacity: usize) -> Result<RenderedLine> {
    let mut line = String::with_capacity(capacity.min(LINE_CAPACITY));
    line.write_fmt(args)
        .map_err(|_| Error::SendFailed("could not format protocol line".to_string()))?;

    let rendered = line.len();
    let terminated = line.ends_with('\n');
    let mut bytes = line.into_bytes();

    if rendered > capacity {
        bytes.truncate(capacity);
        if terminated {
            if let Some(last) = bytes.last_mut() {
                *last = b'\n';
            }
        }
        warn!(
            "Protocol line of {} bytes truncated to {} bytes",
            rendered, capacity
        );
    }

    Ok(RenderedLine { bytes, rendered })
}

/// Send the whole of `buf`, looping over partial writes.
///
/// `handle` is `None` when there is no connection; that fails immediately
/// without touching any stream.
pub async fn send<W>(handle: Option<&mut W>, buf: &[u8]) -> Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let writer = match handle {
        Some(writer) => writer,
        None => {
            warn!("Bad socket. Unable to send data.");
            return Err(Error::SendFailed("not connected".to_string()));
        }
    };

    let mut sent = 0;
    while sent < buf.len() {
        match writer.write(&buf[sent..]).await {
            Ok(0) => {
                warn!("Problem sending data: connection closed after {} of {} bytes", sent, buf.len());
                return Err(Error::SendFailed(
                    "connection closed while sending".to_string(),
                ));
            }
            Ok(bytes) => {
                trace!("Wrote {} bytes ({} of {})", bytes, sent + bytes, buf.len());
                sent += bytes;
            }
            Err(e) => {
                warn!("Problem sending data: {}", e);
                return Err(Error::SendFailed(e.to_string()));
            }
        }
    }

    writer.flush().await.map_err(|e| {
        warn!("Problem flushing data: {}", e);
        Error::SendFailed(e.to_string())
    })?;

    Ok(sent)
}

/// Render a formatted line into a buffer of `capacity` bytes and send it.
///
/// The line is rendered before the returned future is created, so the
/// future does not borrow the format arguments.
pub fn send_fmt<'w, W>(
    handle: Option<&'w mut W>,
    capacity: usize,
    args: fmt::Arguments<'_>,
) -> impl Future<Output = Result<SendReport>> + 'w
where
    W: AsyncWrite + Unpin + ?Sized + 'w,
{
    let line = render(args, capacity);
    async move {
        let line = line?;
        let sent = send(handle, line.as_bytes()).await?;
        Ok(line.report(sent))
    }
}
