// Trustward — Discovery data models

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// How a store was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// The file name carries a known store suffix.
    Extension,
    /// A configuration or source file refers to the path.
    Reference { source: PathBuf },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Extension => write!(f, "extension"),
            Provenance::Reference { source } => write!(f, "referenced by {}", source.display()),
        }
    }
}

/// A discovered store: canonical absolute path plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustStorePath {
    path: PathBuf,
    provenance: Provenance,
    /// Config files that also mention this store.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    referenced_by: Vec<PathBuf>,
}

impl TrustStorePath {
    pub fn new(path: PathBuf, provenance: Provenance) -> Self {
        Self {
            path,
            provenance,
            referenced_by: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn referenced_by(&self) -> &[PathBuf] {
        &self.referenced_by
    }

    pub(crate) fn add_reference(&mut self, source: PathBuf) {
        if !self.referenced_by.contains(&source) {
            self.referenced_by.push(source);
        }
    }
}

impl fmt::Display for TrustStorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.provenance)
    }
}
