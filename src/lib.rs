// Trustward — Library root
//
// Re-exports the discovery, certificate, store, baseline, reconciliation and
// CLI modules.

pub mod baseline;
pub mod certificate;
pub mod cli;
pub mod error;
pub mod locator;
pub mod reconcile;
pub mod store;

pub use error::{Result, TrustwardError};
