//! Gzip helpers for cached payloads.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Gzip-compress `bytes`.
pub fn compress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Decompress a gzip payload.
pub fn decompress(gzipped: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(gzipped).read_to_end(&mut out)?;
    Ok(out)
}

/// True when `bytes` start with a gzip member header using deflate.
#[must_use]
pub fn has_header(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b, 0x08])
}

/// True when `gzipped` decompresses completely with a matching checksum.
#[must_use]
pub fn is_intact(gzipped: &[u8]) -> bool {
    has_header(gzipped) && io::copy(&mut GzDecoder::new(gzipped), &mut io::sink()).is_ok()
}

/// True when an `Accept-Encoding` header value allows gzip.
///
/// Honors `q=0` as an explicit refusal.
#[must_use]
pub fn accepts_gzip(accept_encoding: Option<&str>) -> bool {
    let Some(header) = accept_encoding else {
        return false;
    };
    header.split(',').any(|item| {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or("").trim();
        if !coding.eq_ignore_ascii_case("gzip") && !coding.eq_ignore_ascii_case("x-gzip") {
            return false;
        }
        parts
            .filter_map(|param| param.trim().strip_prefix("q="))
            .all(|q| !matches!(q.trim().parse::<f32>(), Ok(q) if q <= 0.0))
    })
}

/// Writer that forwards everything to `client` while building a gzip copy.
///
/// Used to stream a render to the client and capture it for the cache in
/// the same pass.
pub struct GzipTee<W: Write> {
    client: W,
    capture: GzEncoder<Vec<u8>>,
}

impl<W: Write> GzipTee<W> {
    /// Wrap `client`.
    pub fn new(client: W) -> Self {
        Self {
            client,
            capture: GzEncoder::new(Vec::new(), Compression::default()),
        }
    }

    /// Finish the gzip stream and return the client writer with the capture.
    pub fn finish(mut self) -> io::Result<(W, Vec<u8>)> {
        self.client.flush()?;
        let gzipped = self.capture.finish()?;
        Ok((self.client, gzipped))
    }
}

impl<W: Write> Write for GzipTee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.client.write(buf)?;
        self.capture.write_all(&buf[..written])?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.client.flush()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_compress_decompress() {
        let body = b"<html><body>hello hello hello</body></html>";
        let gzipped = compress(body).unwrap();

        assert_eq!(&gzipped[..2], &[0x1f, 0x8b]);
        assert_eq!(decompress(&gzipped).unwrap(), body);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(decompress(b"not gzip").is_err());
    }

    #[test]
    fn test_is_intact() {
        let gzipped = compress(&b"<p>intact</p>".repeat(50)).unwrap();

        assert!(has_header(&gzipped));
        assert!(is_intact(&gzipped));
        assert!(!is_intact(&gzipped[..gzipped.len() - 4]));
        assert!(!is_intact(&gzipped[..gzipped.len() / 2]));
        assert!(!has_header(b"<p>plain</p>"));
        assert!(!is_intact(b""));
    }

    #[test]
    fn test_accepts_gzip() {
        assert!(accepts_gzip(Some("gzip, deflate, br")));
        assert!(accepts_gzip(Some("deflate;q=1.0, GZIP;q=0.5")));
        assert!(accepts_gzip(Some("x-gzip")));
        assert!(!accepts_gzip(Some("gzip;q=0")));
        assert!(!accepts_gzip(Some("deflate, br")));
        assert!(!accepts_gzip(Some("")));
        assert!(!accepts_gzip(None));
    }

    #[test]
    fn test_tee_sends_and_captures() {
        let mut tee = GzipTee::new(Vec::new());
        tee.write_all(b"<p>one</p>").unwrap();
        tee.write_all(b"<p>two</p>").unwrap();

        let (client, gzipped) = tee.finish().unwrap();

        assert_eq!(client, b"<p>one</p><p>two</p>");
        assert_eq!(decompress(&gzipped).unwrap(), client);
    }
}
