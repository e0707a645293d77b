//! Filter-driven HTTP response compression.
//!
//! Whether a response body is compressed is decided by a [`FilterChain`]: an
//! ordered list of [`ResponseFilter`] predicates over the response headers,
//! combined with logical AND. The decision is made exactly once, at the moment
//! the headers are about to be sent, and every body byte after that follows
//! the chosen route.
//!
//! Two front ends share the same filters:
//!
//! - [`FilterWriter`] wraps a push-style [`ResponseSink`]. The first header
//!   write (or the first body write, which implies `200 OK`) evaluates the
//!   filters and routes the rest of the response either through a reusable
//!   [`CompressWriter`] or straight to the sink.
//! - [`CompressionLayer`] is Tower middleware that makes the same decision
//!   when the inner service's response headers become available.
//!
//! # Example
//!
//! ```ignore
//! use http_response_filter::{CompressWriter, Codec, FilterChain, FilterWriter, LengthFilter};
//!
//! let filters = FilterChain::from(LengthFilter(1024));
//! let mut writer = FilterWriter::new(filters, sink, CompressWriter::new(Codec::Gzip));
//! writer.headers_mut().insert(CONTENT_LENGTH, body.len().into());
//! writer.write(&body)?;
//! let (sink, compressor) = writer.finish()?;
//! ```
//!
//! ```ignore
//! use http_response_filter::CompressionLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(CompressionLayer::new().min_size(860))
//!     .service(my_service);
//! ```
//!
//! # Length policy
//!
//! [`LengthFilter`] allows compression only when `Content-Length` is present,
//! parses as a positive integer, and is at least the threshold. A threshold of
//! zero never compresses.
//!
//! # Response Modifications
//!
//! When compression is applied:
//! - `Content-Encoding` header is set to the codec used
//! - `Content-Length` header is removed (compressed size is unknown)
//! - `Accept-Ranges` header is removed
//! - `Vary` header includes `Accept-Encoding`

#![deny(missing_docs)]

mod body;
mod codec;
mod compress;
mod encoder;
mod filter;
mod future;
mod headers;
mod layer;
mod service;
mod sink;
mod writer;

pub use body::CompressionBody;
pub use codec::Codec;
pub use compress::CompressWriter;
pub use filter::{DEFAULT_MIN_SIZE, FilterChain, ImageFilter, LengthFilter, ResponseFilter};
pub use future::ResponseFuture;
pub use layer::CompressionLayer;
pub use service::CompressionService;
pub use sink::{Discard, ResponseBuffer, ResponseSink};
pub use writer::{Decision, FilterWriter};
