// Trustward — Locator Module
//
// Finds candidate trust stores under a directory: files carrying a known
// store suffix, plus paths referenced from property files, env files,
// application source and web-server configs. Read-only.

mod error;
mod models;
mod references;
mod walk;

pub use error::LocatorError;
pub use models::{Provenance, TrustStorePath};
pub use references::{ReferenceMiner, SourceKind};
pub use walk::{is_store_file_name, Locator, SKIPPED_DIRS};
