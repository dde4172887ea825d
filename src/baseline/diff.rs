// Trustward — Baseline differ
//
// Compares by fingerprint only; aliases, labels and PEM whitespace never
// matter. `missing` follows baseline order and `extra` follows store order,
// so reports are reproducible run to run.

use crate::certificate::{Certificate, CertificateSet};

#[derive(Debug, Default)]
pub struct Diff<'a> {
    /// In the baseline, absent from the store.
    pub missing: Vec<&'a Certificate>,
    /// In the store, absent from the baseline. Reported, never removed.
    pub extra: Vec<&'a Certificate>,
}

pub fn diff<'a>(target: &'a CertificateSet, baseline: &'a CertificateSet) -> Diff<'a> {
    Diff {
        missing: baseline
            .iter()
            .filter(|c| !target.contains(c.fingerprint()))
            .collect(),
        extra: target
            .iter()
            .filter(|c| !baseline.contains(c.fingerprint()))
            .collect(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
