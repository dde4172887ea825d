// Trustward — Reference mining
//
// Each source kind owns a family of patterns with a `value` capture. Values
// are unquoted and resolved against the directory of the file they were
// found in, never against the scan root.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::LocatorError;

/// A family of text files that may name a trust store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Java properties, YAML, XML and similar build/runtime config.
    Properties,
    /// `.env`-style files.
    EnvFile,
    /// JavaScript/TypeScript/JSON/Python sources.
    ApplicationSource,
    /// nginx / Apache httpd configuration.
    WebServerConfig,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Properties,
        SourceKind::EnvFile,
        SourceKind::ApplicationSource,
        SourceKind::WebServerConfig,
    ];

    /// Whether a file name belongs to this kind.
    pub fn matches(self, file_name: &str) -> bool {
        let name = file_name.to_ascii_lowercase();
        let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match self {
            SourceKind::Properties => {
                matches!(ext, "properties" | "conf" | "xml" | "yaml" | "yml" | "gradle")
            }
            SourceKind::EnvFile => {
                name == ".env" || name.ends_with(".env") || name.starts_with(".env.")
            }
            SourceKind::ApplicationSource => {
                matches!(ext, "js" | "mjs" | "cjs" | "ts" | "json" | "py")
            }
            SourceKind::WebServerConfig => ext == "conf",
        }
    }

    fn patterns(self) -> &'static [&'static str] {
        match self {
            SourceKind::Properties => &[
                // key=value / key: value, including javax.net.ssl.trustStore
                r"(?im)^\s*[\w.\-]*trust[-_.]?store(?:[-_.]?(?:path|file|location))?\s*[=:]\s*(?P<value>.+?)\s*$",
                // <truststore>path</truststore>
                r"(?i)<[\w.\-]*trust[-_.]?store(?:[-_.]?(?:path|file|location))?>\s*(?P<value>[^<]+?)\s*</",
                // truststoreFile="path" (Tomcat connectors)
                r#"(?i)\b[\w.\-]*trust[-_.]?store(?:[-_.]?(?:path|file|location))?\s*=\s*"(?P<value>[^"]+)""#,
            ],
            SourceKind::EnvFile => &[
                r"(?im)^\s*(?:export\s+)?(?:[A-Z0-9_]*TRUST_?STORE(?:_?(?:PATH|FILE|LOCATION))?|NODE_EXTRA_CA_CERTS|SSL_CERT_FILE|REQUESTS_CA_BUNDLE|CURL_CA_BUNDLE)\s*=\s*(?P<value>.+?)\s*$",
            ],
            SourceKind::ApplicationSource => &[
                r#"(?i)\b(?:NODE_EXTRA_CA_CERTS|SSL_CERT_FILE|REQUESTS_CA_BUNDLE)\b["']?\]?\s*[:=]\s*["'](?P<value>[^"']+)["']"#,
                r#"(?i)\bNODE_EXTRA_CA_CERTS=(?P<value>[^\s"';]+)"#,
            ],
            SourceKind::WebServerConfig => &[
                r#"(?im)^\s*(?:proxy_)?ssl_(?:trusted|client)_certificate\s+["']?(?P<value>[^;"'\s]+)"#,
                r#"(?im)^\s*SSL(?:CACertificateFile|CertificateChainFile)\s+["']?(?P<value>[^"'\s]+)"#,
            ],
        }
    }
}

/// Compiled patterns for every source kind.
pub struct ReferenceMiner {
    rules: Vec<(SourceKind, Vec<Regex>)>,
}

impl ReferenceMiner {
    pub fn new() -> Result<Self, LocatorError> {
        let mut rules = Vec::with_capacity(SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            let compiled = kind
                .patterns()
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push((kind, compiled));
        }
        Ok(Self { rules })
    }

    /// Whether any source kind wants to read this file.
    pub fn is_source(&self, file_name: &str) -> bool {
        SourceKind::ALL.iter().any(|k| k.matches(file_name))
    }

    /// Extract referenced store paths from `content`, the text of `file`.
    /// Returned paths are absolute if `file` is; existence is not checked.
    pub fn extract(&self, file: &Path, content: &str) -> Vec<PathBuf> {
        let file_name = match file.file_name() {
            Some(n) => n.to_string_lossy(),
            None => return Vec::new(),
        };
        let base = file.parent().unwrap_or_else(|| Path::new("."));

        let mut found: Vec<PathBuf> = Vec::new();
        for (kind, patterns) in &self.rules {
            if !kind.matches(&file_name) {
                continue;
            }
            for pattern in patterns {
                for caps in pattern.captures_iter(content) {
                    let Some(raw) = caps.name("value") else {
                        continue;
                    };
                    if let Some(value) = clean_value(raw.as_str()) {
                        let resolved = resolve(base, value);
                        if !found.contains(&resolved) {
                            found.push(resolved);
                        }
                    }
                }
            }
        }
        found
    }
}

/// Strip quoting and separators; reject values that cannot be a local path.
fn clean_value(raw: &str) -> Option<&str> {
    let value = raw
        .trim()
        .trim_end_matches([';', ','])
        .trim()
        .trim_matches(['"', '\''])
        .trim();
    let value = value
        .strip_prefix("file://")
        .or_else(|| value.strip_prefix("file:"))
        .unwrap_or(value);

    if value.is_empty()
        || value.contains("${")
        || value.starts_with('$')
        || value.starts_with("classpath:")
        || value.contains("://")
        || value.contains(char::is_whitespace)
    {
        return None;
    }
    Some(value)
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
