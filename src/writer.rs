use crate::compress::CompressWriter;
use crate::filter::FilterChain;
use crate::sink::{Discard, ResponseSink};
use http::{HeaderMap, StatusCode};
use std::{io, mem};

/// The outcome of evaluating a [`FilterChain`] for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Body bytes go through the compressing writer.
    Compress,
    /// Body bytes go straight to the raw sink.
    Passthrough,
}

/// Routes one response either through a [`CompressWriter`] or straight to
/// the raw sink.
///
/// The filter chain is evaluated exactly once, on the first header write. A
/// body write with no prior header write sends `200 OK` first. After that the
/// route is fixed: later header writes are passed along the chosen route
/// without consulting the filters again.
///
/// ```ignore
/// let filters = FilterChain::from(LengthFilter(1024));
/// let mut writer = FilterWriter::new(filters, sink, CompressWriter::new(Codec::Gzip));
/// writer.headers_mut().insert(CONTENT_LENGTH, len.into());
/// writer.write(&body)?;
/// let (sink, pooled) = writer.finish()?;
/// ```
#[derive(Debug)]
pub struct FilterWriter<S> {
    filters: FilterChain,
    route: Route<S>,
}

#[derive(Debug)]
enum Route<S> {
    Pending {
        sink: S,
        compressor: CompressWriter<Discard>,
    },
    Passthrough {
        sink: S,
        compressor: CompressWriter<Discard>,
    },
    Compress(CompressWriter<S>),
    /// Only observable if a filter panicked mid-commit.
    Poisoned,
}

impl<S> FilterWriter<S> {
    /// Creates a writer for one response.
    pub fn new(filters: FilterChain, sink: S, compressor: CompressWriter<Discard>) -> Self {
        Self {
            filters,
            route: Route::Pending { sink, compressor },
        }
    }

    /// Returns the committed decision, or `None` before the first header write.
    pub fn decision(&self) -> Option<Decision> {
        match self.route {
            Route::Pending { .. } | Route::Poisoned => None,
            Route::Passthrough { .. } => Some(Decision::Passthrough),
            Route::Compress(_) => Some(Decision::Compress),
        }
    }

    /// Returns `true` once the compression decision has been made.
    pub fn is_committed(&self) -> bool {
        self.decision().is_some()
    }

    /// Returns a reference to the raw sink.
    pub fn get_ref(&self) -> &S {
        match &self.route {
            Route::Pending { sink, .. } | Route::Passthrough { sink, .. } => sink,
            Route::Compress(compressor) => compressor.get_ref(),
            Route::Poisoned => poisoned(),
        }
    }

    /// Returns a mutable reference to the raw sink.
    ///
    /// Writing to it directly bypasses the committed route.
    pub fn get_mut(&mut self) -> &mut S {
        match &mut self.route {
            Route::Pending { sink, .. } | Route::Passthrough { sink, .. } => sink,
            Route::Compress(compressor) => compressor.get_mut(),
            Route::Poisoned => poisoned(),
        }
    }
}

impl<S: ResponseSink> FilterWriter<S> {
    /// Returns the raw sink's pending headers.
    pub fn headers(&self) -> &HeaderMap {
        self.get_ref().headers()
    }

    /// Returns the raw sink's pending headers for modification. Filters see
    /// whatever is set here before the first header write.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.get_mut().headers_mut()
    }

    /// Commits to a route on first call, then sends the status along it.
    pub fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        if let Route::Pending { .. } = self.route {
            return self.commit(status);
        }
        match &mut self.route {
            Route::Passthrough { sink, .. } => sink.write_header(status),
            Route::Compress(compressor) => compressor.write_header(status),
            Route::Pending { .. } | Route::Poisoned => poisoned(),
        }
    }

    /// Writes body bytes along the committed route, committing with
    /// `200 OK` first if no header write has happened.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.is_committed() {
            self.write_header(StatusCode::OK)?;
        }
        match &mut self.route {
            Route::Passthrough { sink, .. } => sink.write(buf),
            Route::Compress(compressor) => compressor.write(buf),
            Route::Pending { .. } | Route::Poisoned => poisoned(),
        }
    }

    /// Flushes the committed route, or the raw sink before commit.
    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.route {
            Route::Pending { sink, .. } | Route::Passthrough { sink, .. } => sink.flush(),
            Route::Compress(compressor) => compressor.flush(),
            Route::Poisoned => poisoned(),
        }
    }

    /// Ends the response, writing the codec trailer if compressing.
    ///
    /// Returns the raw sink and the compressing writer, which is bound to
    /// [`Discard`] again and may be reused for another response. A response
    /// that never committed is returned as is.
    pub fn finish(self) -> io::Result<(S, CompressWriter<Discard>)> {
        match self.route {
            Route::Pending { sink, compressor } | Route::Passthrough { sink, compressor } => {
                Ok((sink, compressor))
            }
            Route::Compress(mut compressor) => {
                compressor.finish()?;
                Ok(compressor.release())
            }
            Route::Poisoned => poisoned(),
        }
    }

    fn commit(&mut self, status: StatusCode) -> io::Result<()> {
        let Route::Pending { sink, compressor } = mem::replace(&mut self.route, Route::Poisoned)
        else {
            unreachable!("commit called after the route was chosen");
        };

        let compress = self.filters.should_compress(sink.headers());
        tracing::trace!(%status, compress, "response compression decided");

        if compress {
            let mut compressor = compressor.reset(sink);
            let result = compressor.write_header(status);
            self.route = Route::Compress(compressor);
            result
        } else {
            let mut sink = sink;
            let result = sink.write_header(status);
            self.route = Route::Passthrough { sink, compressor };
            result
        }
    }
}

impl<S: ResponseSink> ResponseSink for FilterWriter<S> {
    fn headers(&self) -> &HeaderMap {
        FilterWriter::headers(self)
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        FilterWriter::headers_mut(self)
    }

    fn write_header(&mut self, status: StatusCode) -> io::Result<()> {
        FilterWriter::write_header(self, status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FilterWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        FilterWriter::flush(self)
    }
}

impl<S: ResponseSink> io::Write for FilterWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FilterWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        FilterWriter::flush(self)
    }
}

#[cold]
fn poisoned() -> ! {
    panic!("FilterWriter used after a filter panicked")
}
