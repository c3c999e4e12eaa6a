//! Bounded incremental scan of a survey response for an image link
//!
//! Chunks are appended to a window that is re-scanned after every chunk.
//! When nothing matches, only the trailing [`OVERLAP_BYTES`] are kept so a
//! link split across chunk boundaries is still found; older bytes are dropped.
//! Within one window the priority is: absolute `href`, relative `href`
//! (joined to the service URL), absolute `src`.

use crate::types::{PipelineError, PipelineResult};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use reqwest::Url;
use tracing::debug;

/// Longest link (including attribute syntax) that survives a chunk boundary
pub const OVERLAP_BYTES: usize = 4096;

static ABSOLUTE_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*"(https?://[^"\s]+?\.(?:fits\.gz|fits|jpe?g|png))""#)
        .expect("absolute href pattern is valid")
});

static RELATIVE_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*"(/[^"\s]+?\.(?:fits\.gz|fits|jpe?g|png))""#)
        .expect("relative href pattern is valid")
});

static ABSOLUTE_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)src\s*=\s*"(https?://[^"\s]+?\.(?:jpe?g|png))""#)
        .expect("src pattern is valid")
});

fn first_capture(re: &Regex, haystack: &[u8]) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Incremental link finder for one response body
pub struct LinkScanner {
    base: Url,
    window: Vec<u8>,
    total_bytes: usize,
    max_bytes: usize,
}

impl LinkScanner {
    /// `base` is the URL the body came from; `max_bytes` bounds the whole body
    pub fn new(base: Url, max_bytes: usize) -> Self {
        Self {
            base,
            window: Vec::with_capacity(OVERLAP_BYTES * 2),
            total_bytes: 0,
            max_bytes,
        }
    }

    /// Bytes consumed so far
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Feed the next chunk; `Ok(Some(url))` as soon as a link is found
    ///
    /// # Errors
    /// `UpstreamParse` once more than `max_bytes` were consumed without a match
    pub fn feed(&mut self, chunk: &[u8]) -> PipelineResult<Option<String>> {
        self.total_bytes += chunk.len();
        self.window.extend_from_slice(chunk);

        if let Some(url) = self.scan_window()? {
            debug!(url = %url, scanned = self.total_bytes, "Image link found");
            return Ok(Some(url));
        }

        if self.total_bytes > self.max_bytes {
            return Err(PipelineError::UpstreamParse(format!(
                "No image link within the first {} bytes of the survey response",
                self.max_bytes
            )));
        }

        if self.window.len() > OVERLAP_BYTES {
            let excess = self.window.len() - OVERLAP_BYTES;
            self.window.drain(..excess);
        }
        Ok(None)
    }

    fn scan_window(&self) -> PipelineResult<Option<String>> {
        if let Some(url) = first_capture(&ABSOLUTE_HREF_RE, &self.window) {
            return Ok(Some(url));
        }
        if let Some(path) = first_capture(&RELATIVE_HREF_RE, &self.window) {
            let joined = self.base.join(&path).map_err(|e| {
                PipelineError::UpstreamParse(format!("Cannot join link {:?}: {}", path, e))
            })?;
            return Ok(Some(joined.into()));
        }
        Ok(first_capture(&ABSOLUTE_SRC_RE, &self.window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(max_bytes: usize) -> LinkScanner {
        let base = Url::parse("https://skyview.gsfc.nasa.gov/current/cgi/runquery.pl").unwrap();
        LinkScanner::new(base, max_bytes)
    }

    #[test]
    fn test_absolute_href_beats_relative_in_same_window() {
        let body = br#"<a href="/tempspace/fits/a.fits">FITS</a>
            <a href="https://skyview.gsfc.nasa.gov/tempspace/b.jpg">JPEG</a>"#;
        let found = scanner(1 << 20).feed(body).unwrap();
        assert_eq!(
            found.as_deref(),
            Some("https://skyview.gsfc.nasa.gov/tempspace/b.jpg")
        );
    }

    #[test]
    fn test_relative_href_joined_to_origin() {
        let found = scanner(1 << 20)
            .feed(br#"<A HREF="/tempspace/fits/skv123.fits.gz">x</A>"#)
            .unwrap();
        assert_eq!(
            found.as_deref(),
            Some("https://skyview.gsfc.nasa.gov/tempspace/fits/skv123.fits.gz")
        );
    }

    #[test]
    fn test_src_used_when_no_href() {
        let found = scanner(1 << 20)
            .feed(br#"<img src="https://example.org/preview.png">"#)
            .unwrap();
        assert_eq!(found.as_deref(), Some("https://example.org/preview.png"));
    }

    #[test]
    fn test_link_split_across_chunks() {
        let mut scanner = scanner(1 << 20);
        assert_eq!(scanner.feed(b"<html><a hre").unwrap(), None);
        assert_eq!(scanner.feed(b"f=\"https://host/img/").unwrap(), None);
        let found = scanner.feed(b"m81.jpg\">go</a>").unwrap();
        assert_eq!(found.as_deref(), Some("https://host/img/m81.jpg"));
    }

    #[test]
    fn test_window_stays_bounded() {
        let mut scanner = scanner(1 << 20);
        let filler = vec![b'x'; 10_000];
        for _ in 0..5 {
            assert_eq!(scanner.feed(&filler).unwrap(), None);
        }
        assert!(scanner.window.len() <= OVERLAP_BYTES);
        assert_eq!(scanner.total_bytes(), 50_000);
    }

    #[test]
    fn test_ceiling_aborts_with_upstream_parse() {
        let mut scanner = scanner(1000);
        assert!(scanner.feed(&[b' '; 600]).unwrap().is_none());
        let err = scanner.feed(&[b' '; 600]).unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamParse(_)));
    }

    #[test]
    fn test_non_image_links_ignored() {
        let found = scanner(1 << 20)
            .feed(br#"<a href="https://host/help.html">help</a>"#)
            .unwrap();
        assert_eq!(found, None);
    }
}
