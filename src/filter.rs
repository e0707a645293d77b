//! Response filters decide, from the pending response headers, whether a
//! response body should be compressed.

use http::header::{self, HeaderMap};
use std::fmt;
use std::sync::Arc;

/// Default minimum body size for compression (approximately 1 MTU).
pub const DEFAULT_MIN_SIZE: u64 = 860;

/// A predicate over the not-yet-sent response headers.
///
/// Implementations must not assume any body bytes have been written, and must
/// give the same answer for the same headers. Closures taking `&HeaderMap`
/// implement this trait.
pub trait ResponseFilter {
    /// Returns `true` if this filter allows the response to be compressed.
    fn should_compress(&self, headers: &HeaderMap) -> bool;
}

impl<F> ResponseFilter for F
where
    F: Fn(&HeaderMap) -> bool,
{
    fn should_compress(&self, headers: &HeaderMap) -> bool {
        self(headers)
    }
}

/// Allows compression when the declared `Content-Length` is at least the
/// threshold.
///
/// A missing, malformed or zero `Content-Length` never compresses, and a
/// threshold of zero disables compression outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthFilter(pub u64);

impl LengthFilter {
    /// Returns the configured minimum length.
    pub fn threshold(&self) -> u64 {
        self.0
    }
}

impl Default for LengthFilter {
    fn default() -> Self {
        LengthFilter(DEFAULT_MIN_SIZE)
    }
}

impl ResponseFilter for LengthFilter {
    fn should_compress(&self, headers: &HeaderMap) -> bool {
        let length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        match length {
            None | Some(0) => false,
            Some(length) => self.0 != 0 && length >= self.0,
        }
    }
}

/// Refuses `image/*` responses, which are almost always stored in an already
/// compressed format. SVG is text and stays compressible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageFilter;

impl ResponseFilter for ImageFilter {
    fn should_compress(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| !ct.starts_with("image/") || ct.starts_with("image/svg+xml"))
    }
}

impl From<ImageFilter> for FilterChain {
    fn from(filter: ImageFilter) -> Self {
        FilterChain::new().with(filter)
    }
}

type SharedFilter = Arc<dyn ResponseFilter + Send + Sync>;

/// An ordered set of filters combined with logical AND.
///
/// Cloning is cheap; the filters themselves are shared. An empty chain always
/// allows compression.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Arc<[SharedFilter]>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new chain with `filter` appended after the existing ones.
    pub fn with<F>(self, filter: F) -> Self
    where
        F: ResponseFilter + Send + Sync + 'static,
    {
        let mut filters: Vec<SharedFilter> = self.filters.iter().cloned().collect();
        filters.push(Arc::new(filter));
        Self {
            filters: filters.into(),
        }
    }

    /// Number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates every filter in order, stopping at the first refusal.
    pub fn should_compress(&self, headers: &HeaderMap) -> bool {
        self.filters.iter().all(|f| f.should_compress(headers))
    }
}

impl ResponseFilter for FilterChain {
    fn should_compress(&self, headers: &HeaderMap) -> bool {
        FilterChain::should_compress(self, headers)
    }
}

impl From<LengthFilter> for FilterChain {
    fn from(filter: LengthFilter) -> Self {
        FilterChain::new().with(filter)
    }
}

impl<F> FromIterator<F> for FilterChain
where
    F: ResponseFilter + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let filters: Vec<SharedFilter> = iter
            .into_iter()
            .map(|f| Arc::new(f) as SharedFilter)
            .collect();
        Self {
            filters: filters.into(),
        }
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn with_length(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_length_at_or_above_threshold() {
        let filter = LengthFilter(100);
        assert!(filter.should_compress(&with_length("150")));
        assert!(filter.should_compress(&with_length("100")));
    }

    #[test]
    fn test_length_below_threshold() {
        assert!(!LengthFilter(100).should_compress(&with_length("50")));
        assert!(!LengthFilter(100).should_compress(&with_length("99")));
    }

    #[test]
    fn test_missing_length() {
        assert!(!LengthFilter(100).should_compress(&HeaderMap::new()));
        assert!(!LengthFilter(1).should_compress(&HeaderMap::new()));
    }

    #[test]
    fn test_zero_length() {
        assert!(!LengthFilter(1).should_compress(&with_length("0")));
    }

    #[test]
    fn test_malformed_length() {
        let filter = LengthFilter(10);
        assert!(!filter.should_compress(&with_length("abc")));
        assert!(!filter.should_compress(&with_length("-200")));
        assert!(!filter.should_compress(&with_length("12.5")));
        assert!(!filter.should_compress(&with_length("")));
    }

    #[test]
    fn test_zero_threshold_never_compresses() {
        let filter = LengthFilter(0);
        assert!(!filter.should_compress(&with_length("1")));
        assert!(!filter.should_compress(&with_length("1000000")));
    }

    #[test]
    fn test_default_threshold() {
        let filter = LengthFilter::default();
        assert_eq!(filter.threshold(), DEFAULT_MIN_SIZE);
        assert!(!filter.should_compress(&with_length("859")));
        assert!(filter.should_compress(&with_length("860")));
    }

    #[test]
    fn test_image_filter() {
        let content_type = |value: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
            headers
        };

        assert!(!ImageFilter.should_compress(&content_type("image/png")));
        assert!(!ImageFilter.should_compress(&content_type("image/webp")));
        assert!(ImageFilter.should_compress(&content_type("image/svg+xml")));
        assert!(ImageFilter.should_compress(&content_type("image/svg+xml; charset=utf-8")));
        assert!(ImageFilter.should_compress(&content_type("text/html")));
        assert!(ImageFilter.should_compress(&HeaderMap::new()));
    }

    #[test]
    fn test_empty_chain_compresses() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert!(chain.should_compress(&HeaderMap::new()));
    }

    #[test]
    fn test_chain_requires_all() {
        let chain = FilterChain::new()
            .with(LengthFilter(100))
            .with(|h: &HeaderMap| h.contains_key(header::CONTENT_TYPE));

        let mut headers = with_length("500");
        assert!(!chain.should_compress(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        assert!(chain.should_compress(&headers));
    }

    #[test]
    fn test_chain_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let chain = FilterChain::new()
            .with(|_: &HeaderMap| false)
            .with(move |_: &HeaderMap| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            });

        assert!(!chain.should_compress(&HeaderMap::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chain_from_iter_keeps_order() {
        let chain: FilterChain = [LengthFilter(10), LengthFilter(0)].into_iter().collect();
        assert_eq!(chain.len(), 2);
        assert!(!chain.should_compress(&with_length("20")));
    }

    #[test]
    fn test_clone_shares_filters() {
        let chain = FilterChain::from(LengthFilter(10));
        let cloned = chain.clone().with(LengthFilter(50));

        assert_eq!(chain.len(), 1);
        assert_eq!(cloned.len(), 2);
        assert!(chain.should_compress(&with_length("20")));
        assert!(!cloned.should_compress(&with_length("20")));
    }
}
