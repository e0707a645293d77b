use crate::codec::Codec;
use http::header::{self, HeaderMap, HeaderValue};

/// Rewrites response headers for a body that will be encoded with `codec`.
pub(crate) fn mark_encoded(headers: &mut HeaderMap, codec: Codec) {
    headers.insert(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(codec.content_encoding()),
    );

    // Compressed size is unknown until the stream ends.
    headers.remove(header::CONTENT_LENGTH);

    // Byte ranges over the encoded stream are not servable.
    headers.remove(header::ACCEPT_RANGES);

    add_vary_accept_encoding(headers);
}

/// Returns `true` if encoding the body would corrupt the response: it is
/// already encoded, it is a byte range of a larger representation, or it is
/// gRPC, which frames and compresses its own messages.
pub(crate) fn must_not_encode(headers: &HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_ENCODING)
        || headers.contains_key(header::CONTENT_RANGE)
        || is_grpc(headers)
}

fn is_grpc(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.starts_with("application/grpc") && !ct.starts_with("application/grpc-web")
        })
}

fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    let covered = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|v| v == "*" || v.eq_ignore_ascii_case("accept-encoding"));

    if !covered {
        headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
    }
}

#[cfg(test)]
#[cfg(feature = "gzip")]
mod tests {
    use super::*;

    fn headers<I>(pairs: I) -> HeaderMap
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_mark_encoded_rewrites_length_headers() {
        let mut map = headers([("content-length", "1200"), ("accept-ranges", "bytes")]);
        mark_encoded(&mut map, Codec::Gzip);

        assert_eq!(map.get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert!(map.get(header::CONTENT_LENGTH).is_none());
        assert!(map.get(header::ACCEPT_RANGES).is_none());
        assert_eq!(map.get(header::VARY).unwrap(), "accept-encoding");
    }

    #[test]
    fn test_vary_appended_after_existing() {
        let mut map = headers([("vary", "origin")]);
        mark_encoded(&mut map, Codec::Gzip);

        let vary: Vec<_> = map
            .get_all(header::VARY)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(vary, vec!["origin", "accept-encoding"]);
    }

    #[test]
    fn test_vary_already_covered() {
        let mut map = headers([("vary", "Origin, Accept-Encoding")]);
        mark_encoded(&mut map, Codec::Gzip);
        assert_eq!(map.get_all(header::VARY).iter().count(), 1);

        let mut map = headers([("vary", "*")]);
        mark_encoded(&mut map, Codec::Gzip);
        assert_eq!(map.get(header::VARY).unwrap(), "*");
    }

    #[test]
    fn test_must_not_encode() {
        assert!(must_not_encode(&headers([("content-encoding", "br")])));
        assert!(must_not_encode(&headers([("content-range", "bytes 0-3/100")])));
        assert!(must_not_encode(&headers([("content-type", "application/grpc")])));
        assert!(must_not_encode(&headers([("content-type", "application/grpc+proto")])));

        assert!(!must_not_encode(&headers([("content-type", "application/grpc-web")])));
        assert!(!must_not_encode(&headers([("content-type", "text/html")])));
        assert!(!must_not_encode(&HeaderMap::new()));
    }

    #[test]
    fn test_mark_encoded_is_idempotent() {
        let mut map = headers([("content-length", "10")]);
        mark_encoded(&mut map, Codec::Gzip);
        mark_encoded(&mut map, Codec::Gzip);

        assert_eq!(map.get_all(header::CONTENT_ENCODING).iter().count(), 1);
        assert_eq!(map.get_all(header::VARY).iter().count(), 1);
    }
}
