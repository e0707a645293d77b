use crate::filter::{FilterChain, ImageFilter, LengthFilter, ResponseFilter};
use crate::service::CompressionService;
use tower::Layer;

/// A Tower layer that compresses HTTP response bodies.
///
/// A response is compressed when the client accepts a supported encoding, the
/// response is safe to encode (not already encoded, not a byte range, not
/// gRPC), and every configured filter agrees.
#[derive(Debug, Clone)]
pub struct CompressionLayer {
    filters: FilterChain,
}

impl CompressionLayer {
    /// Creates a new compression layer that skips images other than SVG.
    pub fn new() -> Self {
        Self {
            filters: FilterChain::from(ImageFilter),
        }
    }

    /// Only compresses responses declaring a `Content-Length` of at least
    /// `size` bytes.
    ///
    /// Responses without a `Content-Length` are left uncompressed.
    pub fn min_size(self, size: u64) -> Self {
        self.filter(LengthFilter(size))
    }

    /// Appends a filter that must also allow compression.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: ResponseFilter + Send + Sync + 'static,
    {
        self.filters = self.filters.with(filter);
        self
    }

    /// Replaces the configured filters, including the default [`ImageFilter`].
    pub fn filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }
}

impl Default for CompressionLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for CompressionLayer {
    type Service = CompressionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CompressionService::new(inner, self.filters.clone())
    }
}
