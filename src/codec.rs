use compression_codecs::EncodeV2;
#[cfg(feature = "brotli")]
use compression_codecs::brotli::{BrotliEncoder, params::EncoderParams as BrotliParams};
#[cfg(feature = "deflate")]
use compression_codecs::deflate::DeflateEncoder;
#[cfg(feature = "gzip")]
use compression_codecs::gzip::GzipEncoder;
#[cfg(feature = "zstd")]
use compression_codecs::zstd::ZstdEncoder;
#[cfg(any(feature = "gzip", feature = "deflate"))]
use compression_core::Level;

/// Supported compression codecs.
///
/// Each variant is only available when the matching cargo feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Zstd compression.
    #[cfg(feature = "zstd")]
    Zstd,
    /// Brotli compression.
    #[cfg(feature = "brotli")]
    Brotli,
    /// Gzip compression.
    #[cfg(feature = "gzip")]
    Gzip,
    /// Deflate compression.
    #[cfg(feature = "deflate")]
    Deflate,
}

impl Codec {
    /// Returns the Content-Encoding header value for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match *self {
            #[cfg(feature = "zstd")]
            Codec::Zstd => "zstd",
            #[cfg(feature = "brotli")]
            Codec::Brotli => "br",
            #[cfg(feature = "gzip")]
            Codec::Gzip => "gzip",
            #[cfg(feature = "deflate")]
            Codec::Deflate => "deflate",
        }
    }

    /// Creates a fresh encoder for this codec.
    pub(crate) fn encoder(&self) -> Box<dyn EncodeV2 + Send> {
        match *self {
            #[cfg(feature = "zstd")]
            Codec::Zstd => Box::new(ZstdEncoder::new(3)),
            #[cfg(feature = "brotli")]
            Codec::Brotli => Box::new(BrotliEncoder::new(BrotliParams::default())),
            #[cfg(feature = "gzip")]
            Codec::Gzip => Box::new(GzipEncoder::new(Level::Default.into())),
            #[cfg(feature = "deflate")]
            Codec::Deflate => Box::new(DeflateEncoder::new(Level::Default.into())),
        }
    }

    /// Lower is preferred when two encodings carry the same quality.
    fn priority(&self) -> u8 {
        match *self {
            #[cfg(feature = "zstd")]
            Codec::Zstd => 0,
            #[cfg(feature = "brotli")]
            Codec::Brotli => 1,
            #[cfg(feature = "gzip")]
            Codec::Gzip => 2,
            #[cfg(feature = "deflate")]
            Codec::Deflate => 3,
        }
    }

    fn from_token(token: &str) -> Option<Codec> {
        match token.to_ascii_lowercase().as_str() {
            #[cfg(feature = "zstd")]
            "zstd" => Some(Codec::Zstd),
            #[cfg(feature = "brotli")]
            "br" | "brotli" => Some(Codec::Brotli),
            #[cfg(feature = "gzip")]
            "gzip" | "x-gzip" => Some(Codec::Gzip),
            #[cfg(feature = "deflate")]
            "deflate" => Some(Codec::Deflate),
            _ => None,
        }
    }

    /// Parses an Accept-Encoding header value and returns the best supported codec.
    ///
    /// Entries are comma-separated with optional quality values
    /// (e.g. `"gzip, br;q=1.0, zstd;q=0.8"`). Entries with `q=0` are refused.
    pub fn from_accept_encoding(header: &str) -> Option<Codec> {
        let mut best: Option<(Codec, f32)> = None;

        for part in header.split(',') {
            let (encoding, quality) = parse_encoding_with_quality(part.trim());
            if quality <= 0.0 {
                continue;
            }
            let Some(codec) = Codec::from_token(encoding) else {
                continue;
            };

            let better = match best {
                None => true,
                Some((current, q)) => {
                    quality > q || (quality == q && codec.priority() < current.priority())
                }
            };
            if better {
                best = Some((codec, quality));
            }
        }

        best.map(|(codec, _)| codec)
    }
}

/// Splits an entry like `"br;q=0.8"` into `("br", 0.8)`.
fn parse_encoding_with_quality(s: &str) -> (&str, f32) {
    let mut parts = s.splitn(2, ';');
    let encoding = parts.next().unwrap_or("").trim();

    let quality = parts
        .next()
        .map(str::trim)
        .and_then(|q| q.strip_prefix("q=").or_else(|| q.strip_prefix("Q=")))
        .and_then(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0);

    (encoding, quality)
}
