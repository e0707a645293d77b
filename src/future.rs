use crate::body::CompressionBody;
use crate::codec::Codec;
use crate::filter::FilterChain;
use crate::headers::{mark_encoded, must_not_encode};
use http::{Response, header};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Future for compression service responses.
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        accepted_codec: Option<Codec>,
        filters: FilterChain,
    }
}

impl<F> ResponseFuture<F> {
    pub(crate) fn new(inner: F, accepted_codec: Option<Codec>, filters: FilterChain) -> Self {
        Self {
            inner,
            accepted_codec,
            filters,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<CompressionBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(response)) => {
                let response = wrap_response(response, *this.accepted_codec, this.filters);
                Poll::Ready(Ok(response))
            }
        }
    }
}

/// Commits the response to compression or passthrough, now that its headers
/// are known.
fn wrap_response<B>(
    response: Response<B>,
    accepted_codec: Option<Codec>,
    filters: &FilterChain,
) -> Response<CompressionBody<B>> {
    let (mut parts, body) = response.into_parts();

    // Safety guards first; filters only express preference.
    let codec = accepted_codec
        .filter(|_| !must_not_encode(&parts.headers))
        .filter(|_| filters.should_compress(&parts.headers));

    tracing::trace!(
        status = %parts.status,
        codec = codec.map(|c| c.content_encoding()),
        "response compression decided"
    );

    let body = match codec {
        Some(codec) => {
            let always_flush = is_streaming(&parts.headers);
            mark_encoded(&mut parts.headers, codec);
            CompressionBody::compressed(body, codec, always_flush)
        }
        None => CompressionBody::passthrough(body),
    };

    Response::from_parts(parts, body)
}

/// Streaming responses are flushed after every chunk so clients see events
/// as they are produced.
fn is_streaming(headers: &header::HeaderMap) -> bool {
    let no_buffering = headers
        .get("x-accel-buffering")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("no"));

    no_buffering
        || headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| {
                ct.starts_with("text/event-stream") || ct.starts_with("application/grpc-web")
            })
}
