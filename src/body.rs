use crate::codec::Codec;
use crate::encoder::Encoder;
use bytes::{Buf, Bytes, BytesMut};
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A response body that may be compressed.
    ///
    /// Which variant a response gets is decided once, when its headers are
    /// available; see [`CompressionLayer`](crate::CompressionLayer).
    #[project = CompressionBodyProj]
    #[allow(missing_docs)]
    pub enum CompressionBody<B> {
        /// Compressed body with encoder.
        Compressed {
            #[pin]
            inner: B,
            state: CompressedBody,
        },
        /// Passthrough body without compression.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

/// Encoder state for an actively compressed body.
#[derive(Debug)]
pub(crate) struct CompressedBody {
    encoder: Encoder,
    always_flush: bool,
    state: CompressState,
    pending_trailers: Option<http::HeaderMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompressState {
    Reading,
    Finishing,
    Trailers,
    Done,
}

impl CompressedBody {
    fn new(codec: Codec, always_flush: bool) -> Self {
        Self {
            encoder: Encoder::new(codec),
            always_flush,
            state: CompressState::Reading,
            pending_trailers: None,
        }
    }

    pub(crate) fn state(&self) -> CompressState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn always_flush(&self) -> bool {
        self.always_flush
    }

    fn poll_compressed<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>>
    where
        B: Body,
        B::Data: Buf,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        loop {
            match self.state {
                CompressState::Done => return Poll::Ready(None),

                CompressState::Trailers => {
                    self.state = CompressState::Done;
                    if let Some(trailers) = self.pending_trailers.take() {
                        return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
                    }
                }

                CompressState::Finishing => {
                    let mut out = BytesMut::new();
                    if let Err(e) = self.encoder.finish(&mut out) {
                        self.state = CompressState::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    self.state = CompressState::Trailers;
                    if !out.is_empty() {
                        return Poll::Ready(Some(Ok(Frame::data(out.freeze()))));
                    }
                }

                CompressState::Reading => match inner.as_mut().poll_frame(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(None) => self.state = CompressState::Finishing,
                    Poll::Ready(Some(Err(e))) => {
                        return Poll::Ready(Some(Err(io::Error::other(e.into()))));
                    }
                    Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                        Ok(mut data) => {
                            let out = match self.compress_chunk(&mut data) {
                                Ok(out) => out,
                                Err(e) => return Poll::Ready(Some(Err(e))),
                            };
                            // Codecs buffer small inputs; keep reading until
                            // something comes out.
                            if !out.is_empty() {
                                return Poll::Ready(Some(Ok(Frame::data(out))));
                            }
                        }
                        Err(frame) => {
                            if let Ok(trailers) = frame.into_trailers() {
                                self.pending_trailers = Some(trailers);
                                self.state = CompressState::Finishing;
                            }
                        }
                    },
                },
            }
        }
    }

    fn compress_chunk<D: Buf>(&mut self, data: &mut D) -> io::Result<Bytes> {
        let mut out = BytesMut::new();
        while data.has_remaining() {
            let chunk = data.chunk();
            let len = chunk.len();
            self.encoder.encode(chunk, &mut out)?;
            data.advance(len);
        }
        if self.always_flush {
            self.encoder.flush(&mut out)?;
        }
        Ok(out.freeze())
    }
}

impl<B> CompressionBody<B> {
    /// Creates a compressed body with the given codec.
    pub fn compressed(inner: B, codec: Codec, always_flush: bool) -> Self {
        Self::Compressed {
            inner,
            state: CompressedBody::new(codec, always_flush),
        }
    }

    /// Creates a passthrough body without compression.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Returns `true` if this body is being compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressionBody::Compressed { .. })
    }
}

impl<B> Body for CompressionBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CompressionBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
            },
            CompressionBodyProj::Compressed { inner, state } => state.poll_compressed(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CompressionBody::Passthrough { inner } => inner.is_end_stream(),
            CompressionBody::Compressed { state, .. } => state.state() == CompressState::Done,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            CompressionBody::Passthrough { inner } => inner.size_hint(),
            // Compressed size is unknown
            CompressionBody::Compressed { .. } => http_body::SizeHint::default(),
        }
    }
}
