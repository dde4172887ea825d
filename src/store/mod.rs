// Trustward — Store Module
//
// Everything that touches a trust store's bytes: format classification,
// credential probing, and one adapter per on-disk format behind the
// `StoreAdapter` trait. keytool and openssl run as child processes through
// a shared `Toolchain`.

mod adapter;
mod credential;
mod error;
mod format;
mod keystore;
mod pem_bundle;
mod pkcs12;
mod probe;
mod tool;

#[cfg(test)]
pub mod mock;

pub(crate) use adapter::{blocking_io, write_atomic};
pub use adapter::{generate_label, AddOutcome, AdapterRegistry, StoreAdapter};
pub use credential::Credential;
pub use error::{ErrorKind, StoreError};
pub use format::{sniff, Classifier, StoreFormat};
pub use keystore::KeytoolAdapter;
pub use pem_bundle::PemBundleAdapter;
pub use pkcs12::OpensslAdapter;
pub use probe::{probe, Probed};
pub use tool::{ToolOutput, Toolchain, DEFAULT_TOOL_TIMEOUT, PASSWORD_ENV};
