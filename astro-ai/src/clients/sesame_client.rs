//! Sesame Name Resolver Client
//!
//! Resolves an object name (M81, NGC 3031, ...) to J2000 RA/Dec in decimal
//! degrees. The service answers in plain text; the position is the first
//! line of the form `%J <ra> <dec>`.
//!
//! # API Reference
//! - Endpoint: https://cds.unistra.fr/cgi-bin/nph-sesame?<name>
//! - One request per resolution, no retries

use crate::clients::ensure_success;
use crate::config::PipelineConfig;
use crate::types::{NameResolver, PipelineError, PipelineResult};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// `%J 148.88821940 +69.06529514` (RA Dec, decimal degrees)
static SESAME_JPOS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^%J\s+([+-]?[0-9.]+)\s+([+-]?[0-9.]+)").expect("Sesame %J pattern is valid")
});

/// Body marker for an explicit negative answer
const NOTHING_FOUND: &str = "Nothing found";

/// Extract the J2000 position from a Sesame text response
///
/// # Errors
/// `NotFound` when no `%J` line is present; the message says whether the
/// service answered "Nothing found" or the body was just unrecognized.
pub fn parse_sesame_response(name: &str, body: &str) -> PipelineResult<(f64, f64)> {
    let captures = match SESAME_JPOS_RE.captures(body) {
        Some(c) => c,
        None if body.contains(NOTHING_FOUND) => {
            return Err(PipelineError::NotFound(format!(
                "Sesame returned no position for '{}'",
                name
            )));
        }
        None => {
            return Err(PipelineError::NotFound(format!(
                "Sesame returned no position for '{}' (no %J line)",
                name
            )));
        }
    };

    let parse = |idx: usize| -> PipelineResult<f64> {
        captures[idx].parse::<f64>().map_err(|_| {
            PipelineError::NotFound(format!(
                "Sesame returned a malformed position for '{}': {:?}",
                name, &captures[0]
            ))
        })
    };

    Ok((parse(1)?, parse(2)?))
}

/// Sesame client
pub struct SesameClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl SesameClient {
    pub fn new(http_client: Client, config: &PipelineConfig) -> Self {
        Self {
            http_client,
            base_url: config.sesame_url.clone(),
            timeout: config.name_resolution_timeout(),
        }
    }

    /// `<base>?<percent-encoded name>`
    pub fn query_url(&self, name: &str) -> String {
        format!("{}?{}", self.base_url, urlencoding::encode(name))
    }
}

#[async_trait::async_trait]
impl NameResolver for SesameClient {
    fn name(&self) -> &'static str {
        "Sesame"
    }

    async fn resolve(&self, name: &str) -> PipelineResult<(f64, f64)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::InvalidInput(
                "Object name cannot be empty".to_string(),
            ));
        }

        let url = self.query_url(name);
        debug!(name = %name, url = %url, "Querying Sesame");

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;
        let body = ensure_success(response, "Sesame")?.text().await?;

        let (ra_deg, dec_deg) = parse_sesame_response(name, &body)?;
        debug!(name = %name, ra_deg, dec_deg, "Sesame resolution complete");
        Ok((ra_deg, dec_deg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M81_BODY: &str = "# M81\t#Q22914467\n\
        #=Simbad (via url):    1\n\
        %@ 2051\n\
        %I.0 M  81\n\
        %J 148.88821940 +69.06529514 = 09:55:33.17 +69:03:55.0\n\
        %J.E [0.12 0.12 90] A 2007A&A...474..653V\n\
        %J 1.0 2.0\n";

    #[test]
    fn test_first_j_line_wins() {
        let (ra, dec) = parse_sesame_response("M81", M81_BODY).unwrap();
        assert!((ra - 148.8882194).abs() < 1e-9);
        assert!((dec - 69.06529514).abs() < 1e-9);
    }

    #[test]
    fn test_negative_declination() {
        let (ra, dec) = parse_sesame_response("x", "%J 83.82208 -05.39111\n").unwrap();
        assert_eq!(ra, 83.82208);
        assert_eq!(dec, -5.39111);
    }

    #[test]
    fn test_marker_is_case_sensitive_and_line_anchored() {
        assert!(parse_sesame_response("x", "%j 1.0 2.0\n").is_err());
        assert!(parse_sesame_response("x", "note %J 1.0 2.0\n").is_err());
    }

    #[test]
    fn test_nothing_found_distinguished_from_malformed() {
        let nothing = parse_sesame_response("Bogus", "#! *** Nothing found *** \n").unwrap_err();
        let malformed = parse_sesame_response("Bogus", "<html>oops</html>").unwrap_err();

        match (nothing, malformed) {
            (PipelineError::NotFound(a), PipelineError::NotFound(b)) => {
                assert!(!a.contains("no %J line"));
                assert!(b.contains("no %J line"));
            }
            other => panic!("expected NotFound pair, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_name_rejected_without_network() {
        let config = PipelineConfig {
            sesame_url: "http://127.0.0.1:9/unused".to_string(),
            ..Default::default()
        };
        let client = SesameClient::new(Client::new(), &config);
        let err = client.resolve("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_query_url_encodes_name() {
        let config = PipelineConfig::default();
        let client = SesameClient::new(Client::new(), &config);
        assert!(client.query_url("NGC 3031").ends_with("?NGC%203031"));
    }
}
