// Trustward — Binary keystore adapter (keytool)
//
// Listing uses `keytool -list -rfc`, whose output interleaves "Alias name:"
// lines with PEM blocks. Imports run against a sibling copy of the store,
// which replaces the original only after keytool succeeded.
//
// Without a password keytool still lists a JKS, only warning that integrity
// was not verified. Such a listing does not count as opened, so an empty
// candidate only opens stores that really have no password.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::adapter::{blocking_io, generate_label, persist_over, sibling_temp};
use super::tool::PASSWORD_ENV;
use super::{AddOutcome, Credential, StoreAdapter, StoreError, StoreFormat, ToolOutput, Toolchain};
use crate::certificate::{parse_labeled_blocks, Certificate, CertificateSet};

const ALIAS_KEY: &str = "Alias name:";

/// Printed when a keystore was listed without checking its password.
const UNVERIFIED_MARKER: &str = "has NOT been verified";

/// Printed by keytool when it wanted a password it could not prompt for.
/// keytool may still exit 0 after these.
const PROMPT_MARKERS: &[&str] = &["Enter keystore password", "Too many failures"];

pub struct KeytoolAdapter {
    toolchain: Arc<Toolchain>,
}

impl KeytoolAdapter {
    pub fn new(toolchain: Arc<Toolchain>) -> Self {
        Self { toolchain }
    }

    async fn keytool(&self, args: Vec<OsString>, credential: &Credential) -> Result<ToolOutput, StoreError> {
        let program = self.toolchain.keytool()?;
        let (args, secrets) = with_store_password(args, credential);
        self.toolchain.run(program, &args, &secrets).await
    }
}

/// Force English diagnostics and attach the password source. An empty
/// password is passed as no password at all.
fn with_store_password<'a>(
    mut args: Vec<OsString>,
    credential: &'a Credential,
) -> (Vec<OsString>, Vec<(&'static str, &'a str)>) {
    args.insert(0, "-J-Duser.language=en".into());
    match credential.expose() {
        Some(secret) if !secret.is_empty() => {
            args.push("-storepass:env".into());
            args.push(PASSWORD_ENV.into());
            (args, vec![(PASSWORD_ENV, secret)])
        }
        _ => (args, Vec::new()),
    }
}

fn list_args(path: &Path) -> Vec<OsString> {
    vec!["-list".into(), "-rfc".into(), "-keystore".into(), path.into()]
}

fn import_args(store: &Path, cert_file: &Path, alias: &str) -> Vec<OsString> {
    vec![
        "-importcert".into(),
        "-noprompt".into(),
        "-trustcacerts".into(),
        "-alias".into(),
        alias.into(),
        "-file".into(),
        cert_file.into(),
        "-keystore".into(),
        store.into(),
    ]
}

fn mentions(output: &ToolOutput, marker: &str) -> bool {
    output.stdout.contains(marker) || output.stderr.contains(marker)
}

fn tool_error(detail: String) -> StoreError {
    StoreError::ExternalTool {
        tool: "keytool".into(),
        detail,
    }
}

/// Accept a `-list` run only when it succeeded and the password was checked.
fn read_listing(path: &Path, output: &ToolOutput) -> Result<CertificateSet, StoreError> {
    if !output.success() {
        return Err(tool_error(output.detail()));
    }
    if mentions(output, UNVERIFIED_MARKER) {
        return Err(tool_error("keystore integrity not verified; password required".into()));
    }
    parse_listing(path, &output.stdout)
}

/// An import that stopped at a password prompt did not import anything,
/// whatever the exit status says.
fn check_import(output: &ToolOutput) -> Result<(), StoreError> {
    if !output.success() {
        return Err(tool_error(output.detail()));
    }
    if let Some(marker) = PROMPT_MARKERS.iter().find(|m| mentions(output, m)) {
        return Err(tool_error(format!("keytool asked for a password: {}", marker)));
    }
    Ok(())
}

/// Build a certificate set from `keytool -list -rfc` output.
pub fn parse_listing(path: &Path, stdout: &str) -> Result<CertificateSet, StoreError> {
    let blocks = parse_labeled_blocks(stdout, ALIAS_KEY).map_err(|e| StoreError::malformed(path, e))?;

    let mut set = CertificateSet::new();
    for (alias, cert) in blocks {
        set.insert_labeled(cert, alias);
    }
    Ok(set)
}

#[async_trait]
impl StoreAdapter for KeytoolAdapter {
    fn format(&self) -> StoreFormat {
        StoreFormat::BinaryKeystore
    }

    async fn list(&self, path: &Path, credential: &Credential) -> Result<CertificateSet, StoreError> {
        let output = self.keytool(list_args(path), credential).await?;
        read_listing(path, &output)
    }

    async fn add_certificate(
        &self,
        path: &Path,
        credential: &Credential,
        cert: &Certificate,
    ) -> Result<AddOutcome, StoreError> {
        if self.list(path, credential).await?.contains(cert.fingerprint()) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let pem = cert.to_pem();
        let store = path.to_path_buf();
        let (cert_file, working) = blocking_io(move || -> io::Result<_> {
            let mut cert_file = tempfile::Builder::new()
                .prefix("trustward-cert-")
                .suffix(".pem")
                .tempfile()?;
            cert_file.write_all(pem.as_bytes())?;
            cert_file.flush()?;

            let working = sibling_temp(&store)?;
            fs::copy(&store, working.path())?;
            Ok((cert_file, working))
        })
        .await?;

        let label = generate_label(cert.fingerprint());
        let output = self
            .keytool(import_args(working.path(), cert_file.path(), &label), credential)
            .await?;
        check_import(&output)?;

        let store = path.to_path_buf();
        blocking_io(move || {
            let result = persist_over(working, &store);
            drop(cert_file);
            result
        })
        .await?;
        tracing::debug!(path = %path.display(), alias = %label, "Imported certificate");
        Ok(AddOutcome::Added { label })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
