// Trustward — Baseline loading
//
// A baseline is fetched fresh on every invocation and never cached. The body
// is a PEM bundle or, when no armour is present, a single DER certificate.
// A download failure falls back to a local copy when one is configured.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::BaselineError;
use crate::certificate::{parse_certificates, CertificateSet};

/// Where the baseline comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineSource {
    Path(PathBuf),
    Url {
        url: String,
        /// Local copy used when the download fails.
        fallback: Option<PathBuf>,
        verify_tls: bool,
    },
}

impl BaselineSource {
    /// `http://` and `https://` values are URLs, anything else a path.
    pub fn parse(value: &str) -> Result<Self, BaselineError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(BaselineError::InvalidSource("empty value".into()));
        }

        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(BaselineSource::Url {
                url: value.to_string(),
                fallback: None,
                verify_tls: true,
            });
        }
        if value.contains("://") {
            return Err(BaselineError::InvalidSource(format!(
                "unsupported scheme in '{}'",
                value
            )));
        }

        Ok(BaselineSource::Path(PathBuf::from(value)))
    }

    /// Set the fallback path of a URL source. No effect on path sources.
    pub fn with_fallback(mut self, path: Option<PathBuf>) -> Self {
        if let BaselineSource::Url { fallback, .. } = &mut self {
            *fallback = path;
        }
        self
    }

    /// Toggle TLS certificate verification for URL sources.
    pub fn with_tls_verification(mut self, enabled: bool) -> Self {
        if let BaselineSource::Url { verify_tls, .. } = &mut self {
            *verify_tls = enabled;
        }
        self
    }
}

impl fmt::Display for BaselineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineSource::Path(path) => write!(f, "{}", path.display()),
            BaselineSource::Url { url, .. } => f.write_str(url),
        }
    }
}

/// The authoritative certificate set for one run. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct Baseline {
    origin: String,
    certificates: CertificateSet,
}

impl Baseline {
    pub fn new(origin: impl Into<String>, certificates: CertificateSet) -> Self {
        Self {
            origin: origin.into(),
            certificates,
        }
    }

    pub async fn load(source: &BaselineSource, timeout: Duration) -> Result<Self, BaselineError> {
        let baseline = match source {
            BaselineSource::Path(path) => load_path(path).await?,
            BaselineSource::Url {
                url,
                fallback,
                verify_tls,
            } => {
                let fetched = match download(url, timeout, *verify_tls).await {
                    Ok(body) => decode(url, &body),
                    Err(e) => Err(e),
                };
                match (fetched, fallback) {
                    (Ok(baseline), _) => baseline,
                    (Err(e), Some(path)) => {
                        tracing::warn!(url = %url, fallback = %path.display(), error = %e, "Baseline download failed, using fallback");
                        load_path(path).await?
                    }
                    (Err(e), None) => return Err(e),
                }
            }
        };

        tracing::info!(
            origin = %baseline.origin,
            certificates = baseline.certificates.len(),
            "Baseline loaded"
        );
        Ok(baseline)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn certificates(&self) -> &CertificateSet {
        &self.certificates
    }
}

async fn load_path(path: &Path) -> Result<Baseline, BaselineError> {
    let origin = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BaselineError::unavailable(origin.as_str(), e))?;
    decode(&origin, &bytes)
}

async fn download(url: &str, timeout: Duration, verify_tls: bool) -> Result<Vec<u8>, BaselineError> {
    if !verify_tls {
        tracing::warn!(url = %url, "TLS certificate verification disabled for baseline download");
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| BaselineError::unavailable(url, e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BaselineError::unavailable(url, e))?;

    if !response.status().is_success() {
        return Err(BaselineError::unavailable(
            url,
            format!("server returned status {}", response.status()),
        ));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| BaselineError::unavailable(url, e))
}

fn decode(origin: &str, bytes: &[u8]) -> Result<Baseline, BaselineError> {
    let certs = parse_certificates(bytes).map_err(|e| BaselineError::unavailable(origin, e))?;
    let certificates: CertificateSet = certs.into_iter().collect();
    for warning in certificates.duplicate_warnings() {
        tracing::warn!(origin = %origin, "{}", warning);
    }
    Ok(Baseline::new(origin, certificates))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
