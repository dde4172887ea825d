// Trustward — PEM/DER decoding
//
// Splits text into certificate blocks. Listings produced by keytool and
// openssl interleave label lines ("Alias name:", "friendlyName:") with PEM
// blocks; `parse_labeled_blocks` keeps the label each block appeared under.

use super::{Certificate, CertificateError};

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";

/// Tags that carry an X.509 certificate body.
fn is_certificate_tag(tag: &str) -> bool {
    tag == "CERTIFICATE" || tag == "TRUSTED CERTIFICATE" || tag == "X509 CERTIFICATE"
}

/// Parse every certificate block of a PEM bundle. Non-certificate blocks
/// (private keys, parameters) are ignored.
pub fn parse_pem_bundle(input: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
    pem::parse_many(input)?
        .into_iter()
        .filter(|block| is_certificate_tag(block.tag()))
        .map(|block| Certificate::from_der(block.into_contents()))
        .collect()
}

/// Parse either a PEM bundle or, when no PEM armour is present, a single DER
/// certificate. Fails with `Empty` when nothing is found.
pub fn parse_certificates(input: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
    let certs = if contains_subslice(input, b"-----BEGIN") {
        parse_pem_bundle(input)?
    } else if input.is_empty() {
        Vec::new()
    } else {
        vec![Certificate::from_der(input.to_vec())?]
    };

    if certs.is_empty() {
        return Err(CertificateError::Empty);
    }
    Ok(certs)
}

/// Number of `BEGIN CERTIFICATE` markers in the text.
pub fn count_certificate_markers(text: &str) -> usize {
    text.matches(BEGIN_CERTIFICATE).count()
}

/// True when the text holds at least one complete BEGIN/END certificate pair.
pub fn has_certificate_block(text: &str) -> bool {
    match text.find(BEGIN_CERTIFICATE) {
        Some(start) => text[start..].contains(END_CERTIFICATE),
        None => false,
    }
}

/// Parse PEM certificate blocks from tool output, tagging each with the
/// value of the last `label_key` line (e.g. `"Alias name:"`) seen since the
/// previous block. A label applies to one block only.
///
/// Every block that starts must end; a dangling BEGIN is reported as
/// `Unterminated` so a truncated listing never reads as a shorter store.
pub fn parse_labeled_blocks(
    text: &str,
    label_key: &str,
) -> Result<Vec<(Option<String>, Certificate)>, CertificateError> {
    let mut out = Vec::new();
    let mut label: Option<String> = None;
    let mut block: Option<(usize, String)> = None;

    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();

        if let Some((start, mut buf)) = block.take() {
            buf.push_str(trimmed);
            buf.push('\n');
            if trimmed == END_CERTIFICATE {
                let parsed = pem::parse(&buf)?;
                out.push((label.take(), Certificate::from_der(parsed.into_contents())?));
            } else {
                block = Some((start, buf));
            }
            continue;
        }

        if trimmed == BEGIN_CERTIFICATE {
            let mut buf = String::with_capacity(2048);
            buf.push_str(trimmed);
            buf.push('\n');
            block = Some((lineno + 1, buf));
        } else if let Some(value) = trimmed.strip_prefix(label_key) {
            let value = value.trim();
            label = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
    }

    if let Some((start, _)) = block {
        return Err(CertificateError::Unterminated(start));
    }

    Ok(out)
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
