//! Body replay
//!
//! A body stream can only be read once. To snapshot it without starving
//! the real handler, it is drained into memory and replayed as many
//! independent copies as needed.

use std::convert::Infallible;
use std::io::Write;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::HeaderMap;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::{BodyExt, Limited};
use httplog_core::AuditError;
use tokio::sync::oneshot;

/// A fully buffered body (data plus trailers) that can be replayed
#[derive(Debug, Clone, Default)]
pub struct Replay {
    data: Bytes,
    trailers: Option<HeaderMap>,
}

impl Replay {
    /// Buffer `body` completely.
    ///
    /// A body that is already at end of stream is not read at all.
    pub async fn drain(body: Body) -> Result<Self, AuditError> {
        if body.is_end_stream() {
            return Ok(Self::default());
        }

        let collected = body
            .collect()
            .await
            .map_err(|e| AuditError::BodyRead(e.to_string()))?;
        let trailers = collected.trailers().cloned();

        Ok(Self {
            data: collected.to_bytes(),
            trailers,
        })
    }

    /// Buffer `body` like [`drain`](Self::drain), failing with `BodyRead`
    /// once more than `limit` bytes have arrived
    pub async fn drain_limited(body: Body, limit: usize) -> Result<Self, AuditError> {
        Self::drain(Body::new(Limited::new(body, limit))).await
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.trailers.is_none()
    }

    /// A fresh readable copy. Empty content yields `Body::empty()`.
    pub fn body(&self) -> Body {
        if self.is_empty() {
            return Body::empty();
        }
        Body::new(ReplayBody {
            data: (!self.data.is_empty()).then(|| self.data.clone()),
            trailers: self.trailers.clone(),
        })
    }

    /// Render the content as text.
    ///
    /// With `chunked`, the content is re-framed the way chunked transfer
    /// coding puts it on the wire, ending with the zero-length chunk and
    /// the final CRLF.
    pub fn dump(&self, chunked: bool) -> String {
        let mut out = Vec::with_capacity(self.data.len() + 16);
        if chunked {
            if !self.data.is_empty() {
                // Writes into a Vec cannot fail
                let _ = write!(out, "{:x}\r\n", self.data.len());
                out.extend_from_slice(&self.data);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
        } else {
            out.extend_from_slice(&self.data);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Read `body` once and return two independent copies of its content.
///
/// An empty body comes back as two `Body::empty()` values without any
/// buffering.
pub async fn split(body: Body) -> Result<(Body, Body), AuditError> {
    if body.is_end_stream() {
        return Ok((Body::empty(), Body::empty()));
    }
    let replay = Replay::drain(body).await?;
    Ok((replay.body(), replay.body()))
}

/// One replayed copy: the buffered data frame, then the trailers
struct ReplayBody {
    data: Option<Bytes>,
    trailers: Option<HeaderMap>,
}

impl HttpBody for ReplayBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        if let Some(data) = self.data.take() {
            return Poll::Ready(Some(Ok(Frame::data(data))));
        }
        if let Some(trailers) = self.trailers.take() {
            return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
        }
        Poll::Ready(None)
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.data.as_ref().map_or(0, |d| d.len() as u64))
    }
}

/// Wrap `body` so that `delivered` resolves once the body has been dropped,
/// i.e. after the server finished writing it or the client went away.
pub(crate) fn notify_when_dropped(body: Body, delivered: oneshot::Sender<()>) -> Body {
    Body::new(DeliveryBody {
        inner: body,
        _delivered: delivered,
    })
}

struct DeliveryBody {
    inner: Body,
    _delivered: oneshot::Sender<()>,
}

impl HttpBody for DeliveryBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
