//! The response primitive that filter and compressing writers forward to.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use std::io;

/// A destination for one HTTP response: a mutable pending header set, a
/// single status line, then body bytes.
///
/// Calls are synchronous and order-preserving.
pub trait ResponseSink {
    /// Returns the pending response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the pending response headers for modification. Changes made
    /// after [`write_header`](ResponseSink::write_header) have no effect on
    /// what was sent.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line together with the pending headers.
    fn write_header(&mut self, status: StatusCode) -> io::Result<()>;

    /// Writes body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flushes any buffered body bytes.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        (**self).write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for Box<S> {
    fn headers(&self) -> &HeaderMap {
        (**self).headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        (**self).write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes all of `buf`, retrying short writes.
pub(crate) fn write_all<S: ResponseSink + ?Sized>(sink: &mut S, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// A sink that accepts and drops everything.
///
/// Compressing writers are bound to it until a response commits to compression.
#[derive(Debug, Default)]
pub struct Discard {
    headers: HeaderMap,
}

impl ResponseSink for Discard {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, _status: StatusCode) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

/// An in-memory response.
///
/// A body write before any header write sends `200 OK` first. Only the
/// first header write counts; later ones are ignored with a warning.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    headers: HeaderMap,
    sent: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
}

impl ResponseBuffer {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status sent, if a header write has happened.
    pub fn status(&self) -> Option<StatusCode> {
        self.sent.as_ref().map(|(status, _)| *status)
    }

    /// Returns the headers as they were when the status was sent.
    pub fn sent_headers(&self) -> Option<&HeaderMap> {
        self.sent.as_ref().map(|(_, headers)| headers)
    }

    /// Returns the body bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts into an [`http::Response`] carrying the sent status and
    /// headers, or `200 OK` with the pending headers if nothing was sent.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let (status, headers) = self
            .sent
            .unwrap_or((StatusCode::OK, self.headers));

        let mut response = Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseSink for ResponseBuffer {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        if let Some((sent, _)) = &self.sent {
            tracing::warn!(%sent, ignored = %status, "superfluous response header write");
            return Ok(());
        }
        self.sent = Some((status, self.headers.clone()));
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sent.is_none() {
            self.write_header(StatusCode::OK)?;
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{self, HeaderValue};

    #[test]
    fn test_buffer_snapshots_headers_at_header_write() {
        let mut sink = ResponseBuffer::new();
        sink.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        sink.write_header(StatusCode::CREATED).unwrap();
        sink.headers_mut()
            .insert("x-late", HeaderValue::from_static("1"));

        assert_eq!(sink.status(), Some(StatusCode::CREATED));
        let sent = sink.sent_headers().unwrap();
        assert_eq!(sent.get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert!(sent.get("x-late").is_none());
    }

    #[test]
    fn test_buffer_implicit_ok() {
        let mut sink = ResponseBuffer::new();
        assert_eq!(sink.write(b"body").unwrap(), 4);
        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert_eq!(sink.body(), b"body");
    }

    #[test]
    fn test_buffer_ignores_second_header_write() {
        let mut sink = ResponseBuffer::new();
        sink.write_header(StatusCode::NOT_FOUND).unwrap();
        sink.write_header(StatusCode::OK).unwrap();
        assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_buffer_into_response() {
        let mut sink = ResponseBuffer::new();
        sink.headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("2"));
        sink.write_header(StatusCode::ACCEPTED).unwrap();
        sink.write(b"ok").unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "2");
    }

    #[test]
    fn test_mut_ref_forwards() {
        let mut sink = ResponseBuffer::new();
        {
            let mut borrowed = &mut sink;
            ResponseSink::write(&mut borrowed, b"abc").unwrap();
        }
        assert_eq!(sink.body(), b"abc");
    }

    struct Trickle(Vec<u8>);

    impl ResponseSink for Trickle {
        fn headers(&self) -> &HeaderMap {
            unimplemented!()
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            unimplemented!()
        }

        fn write_header(&mut self, _status: StatusCode) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.push(buf[0]);
            Ok(1)
        }
    }

    #[test]
    fn test_write_all_retries_short_writes() {
        let mut sink = Trickle(Vec::new());
        write_all(&mut sink, b"hello").unwrap();
        assert_eq!(sink.0, b"hello");
    }
}
