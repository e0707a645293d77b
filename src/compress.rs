use crate::codec::Codec;
use crate::encoder::Encoder;
use crate::headers::mark_encoded;
use crate::sink::{self, Discard, ResponseSink};
use bytes::BytesMut;
use http::{HeaderMap, StatusCode};
use std::io;

/// A reusable compressing writer in front of a [`ResponseSink`].
///
/// A new writer is bound to [`Discard`]. [`reset`](CompressWriter::reset)
/// moves it onto a real destination, and [`release`](CompressWriter::release)
/// gives the destination back along with a writer that can be pooled for the
/// next response.
#[derive(Debug)]
pub struct CompressWriter<W> {
    encoder: Encoder,
    pending: BytesMut,
    finished: bool,
    dest: W,
}

impl CompressWriter<Discard> {
    /// Creates a writer for `codec` bound to a placeholder destination.
    pub fn new(codec: Codec) -> Self {
        Self {
            encoder: Encoder::new(codec),
            pending: BytesMut::new(),
            finished: false,
            dest: Discard::default(),
        }
    }
}

impl<W> CompressWriter<W> {
    /// Returns the codec this writer encodes with.
    pub fn codec(&self) -> Codec {
        self.encoder.codec()
    }

    /// Returns a reference to the destination.
    pub fn get_ref(&self) -> &W {
        &self.dest
    }

    /// Returns a mutable reference to the destination.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.dest
    }

    /// Starts a new stream writing to `dest`, dropping the current destination
    /// and any unfinished output.
    pub fn reset<T>(self, dest: T) -> CompressWriter<T> {
        let mut encoder = self.encoder;
        encoder.reset();

        let mut pending = self.pending;
        pending.clear();

        CompressWriter {
            encoder,
            pending,
            finished: false,
            dest,
        }
    }

    /// Splits off the destination, leaving a writer bound to [`Discard`].
    pub fn release(self) -> (W, CompressWriter<Discard>) {
        let CompressWriter {
            mut encoder,
            mut pending,
            dest,
            ..
        } = self;
        encoder.reset();
        pending.clear();

        let placeholder = CompressWriter {
            encoder,
            pending,
            finished: false,
            dest: Discard::default(),
        };
        (dest, placeholder)
    }
}

impl<W: ResponseSink> CompressWriter<W> {
    /// Marks the pending headers as encoded, then sends the status.
    pub fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        mark_encoded(self.dest.headers_mut(), self.encoder.codec());
        self.dest.write_header(status)
    }

    /// Compresses `buf` and writes whatever the codec produced.
    ///
    /// All of `buf` is consumed on success.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("write after compressed stream finished"));
        }
        self.encoder.encode(buf, &mut self.pending)?;
        self.drain()?;
        Ok(buf.len())
    }

    /// Pushes buffered input through the codec and flushes the destination.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.finished {
            self.encoder.flush(&mut self.pending)?;
            self.drain()?;
        }
        self.dest.flush()
    }

    /// Writes the codec trailer. Further calls are no-ops.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.encoder.finish(&mut self.pending)?;
        self.finished = true;
        self.drain()?;
        self.dest.flush()
    }

    fn drain(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = sink::write_all(&mut self.dest, &self.pending);
        self.pending.clear();
        result
    }
}

impl<W: ResponseSink> ResponseSink for CompressWriter<W> {
    fn headers(&self) -> &HeaderMap {
        self.dest.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.dest.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        CompressWriter::write_header(self, status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CompressWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        CompressWriter::flush(self)
    }
}

impl<W: ResponseSink> io::Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CompressWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        CompressWriter::flush(self)
    }
}
