// Trustward — Certificate sets
//
// An insertion-ordered collection keyed by fingerprint. Inserting a
// certificate that is already present collapses it into the existing entry
// but keeps the label, so a keystore holding the same certificate under two
// aliases can be reported instead of silently flattened.

use std::collections::HashMap;

use super::{Certificate, Fingerprint};

#[derive(Debug, Clone, Default)]
pub struct CertificateSet {
    entries: Vec<Entry>,
    index: HashMap<Fingerprint, usize>,
}

#[derive(Debug, Clone)]
struct Entry {
    cert: Certificate,
    labels: Vec<String>,
    occurrences: usize,
}

impl CertificateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a certificate. Returns `true` if its fingerprint was new.
    pub fn insert(&mut self, cert: Certificate) -> bool {
        self.insert_labeled(cert, None)
    }

    /// Insert a certificate found under `label` (alias, friendly name).
    pub fn insert_labeled(&mut self, cert: Certificate, label: Option<String>) -> bool {
        if let Some(&i) = self.index.get(cert.fingerprint()) {
            let entry = &mut self.entries[i];
            entry.occurrences += 1;
            if let Some(label) = label {
                entry.labels.push(label);
            }
            return false;
        }

        self.index.insert(*cert.fingerprint(), self.entries.len());
        self.entries.push(Entry {
            cert,
            labels: label.into_iter().collect(),
            occurrences: 1,
        });
        true
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.index.contains_key(fingerprint)
    }

    /// Labels the certificate was found under, in listing order.
    pub fn labels(&self, fingerprint: &Fingerprint) -> &[String] {
        self.index
            .get(fingerprint)
            .map(|&i| self.entries[i].labels.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Certificates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.entries.iter().map(|e| &e.cert)
    }

    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.entries.iter().map(|e| *e.cert.fingerprint()).collect()
    }

    /// Certificates that appeared more than once, with every label seen.
    pub fn duplicates(&self) -> Vec<(&Certificate, &[String])> {
        self.entries
            .iter()
            .filter(|e| e.occurrences > 1)
            .map(|e| (&e.cert, e.labels.as_slice()))
            .collect()
    }

    /// Human-readable warnings for `duplicates()`.
    pub fn duplicate_warnings(&self) -> Vec<String> {
        self.duplicates()
            .into_iter()
            .map(|(cert, labels)| {
                if labels.is_empty() {
                    format!("certificate {} appears more than once", cert)
                } else {
                    format!(
                        "certificate {} is stored under multiple labels: {}",
                        cert,
                        labels.join(", ")
                    )
                }
            })
            .collect()
    }
}

impl FromIterator<Certificate> for CertificateSet {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut set = Self::new();
        for cert in iter {
            set.insert(cert);
        }
        set
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(name: &str) -> Certificate {
        let key = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
        Certificate::from_der(key.cert.der().to_vec()).unwrap()
    }

    #[test]
    fn test_duplicates_by_fingerprint_collapse() {
        let a = cert("a.example");
        let mut set = CertificateSet::new();
        assert!(set.insert(a.clone()));
        assert!(!set.insert(a.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.contains(a.fingerprint()));
    }

    #[test]
    fn test_alias_duplicates_are_reported() {
        let a = cert("alias.example");
        let b = cert("other.example");
        let mut set = CertificateSet::new();
        set.insert_labeled(a.clone(), Some("corp-root".into()));
        set.insert_labeled(b, Some("other".into()));
        set.insert_labeled(a.clone(), Some("corp-root-copy".into()));

        assert_eq!(set.len(), 2);
        assert_eq!(set.labels(a.fingerprint()), ["corp-root", "corp-root-copy"]);

        let dups = set.duplicates();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0, &a);

        let warnings = set.duplicate_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("corp-root-copy"));
    }

    #[test]
    fn test_iteration_preserves_first_seen_order() {
        let a = cert("1.example");
        let b = cert("2.example");
        let c = cert("3.example");
        let set: CertificateSet = vec![b.clone(), a.clone(), b.clone(), c.clone()]
            .into_iter()
            .collect();

        let order: Vec<_> = set.iter().cloned().collect();
        assert_eq!(order, vec![b, a, c]);
    }
}
