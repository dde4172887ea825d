// Trustward — Baseline Module
//
// The authoritative certificate set a run reconciles against, loaded once
// per invocation from a local file or a URL, and the fingerprint differ
// that compares a store with it.

mod diff;
mod error;
mod source;

pub use diff::{diff, Diff};
pub use error::BaselineError;
pub use source::{Baseline, BaselineSource};
