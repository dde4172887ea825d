// Trustward — External tool runner
//
// keytool and openssl run as child processes with a null stdin, captured
// output and a hard timeout. The child is killed when the timeout drops the
// wait. Secrets are handed over as environment variables, never as argv.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use super::StoreError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default per-invocation timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable carrying the store password to the child.
pub const PASSWORD_ENV: &str = "TRUSTWARD_STOREPASS";

/// Directories searched for installed JVMs when keytool is not on PATH.
const JVM_ROOTS: &[&str] = &[
    "/usr/lib/jvm",
    "/usr/java",
    "/opt/java",
    "/Library/Java/JavaVirtualMachines",
];

/// Longest tool diagnostic kept in an error.
const MAX_DETAIL_CHARS: usize = 400;

// ─── Output ──────────────────────────────────────────────────────────────────

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short diagnostic: stderr if present, otherwise stdout.
    pub fn detail(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let mut detail: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        if text.chars().count() > MAX_DETAIL_CHARS {
            detail.push_str("...");
        }
        match self.status {
            Some(code) => format!("exit {}: {}", code, detail),
            None => format!("terminated by signal: {}", detail),
        }
    }
}

// ─── Toolchain ───────────────────────────────────────────────────────────────

/// Locations of the external tools plus the invocation timeout.
#[derive(Debug, Clone)]
pub struct Toolchain {
    keytool: Option<PathBuf>,
    openssl: PathBuf,
    timeout: Duration,
}

impl Toolchain {
    /// Explicit paths win; keytool is otherwise discovered, openssl is
    /// resolved through PATH by the OS.
    pub fn new(keytool: Option<PathBuf>, openssl: Option<PathBuf>, timeout: Duration) -> Self {
        let keytool = keytool.or_else(discover_keytool);
        match &keytool {
            Some(path) => tracing::debug!(keytool = %path.display(), "Using keytool"),
            None => tracing::debug!("keytool not found; binary keystores cannot be opened"),
        }
        Self {
            keytool,
            openssl: openssl.unwrap_or_else(|| PathBuf::from("openssl")),
            timeout,
        }
    }

    pub fn keytool(&self) -> Result<&Path, StoreError> {
        self.keytool
            .as_deref()
            .ok_or_else(|| StoreError::ToolUnavailable {
                tool: "keytool".into(),
                detail: "not on PATH, JAVA_HOME or a known JVM directory".into(),
            })
    }

    pub fn openssl(&self) -> &Path {
        &self.openssl
    }

    /// Run `program` with `args`, exporting `secrets` into the child's
    /// environment. A non-zero exit is returned as output, not as an error.
    pub async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        secrets: &[(&str, &str)],
    ) -> Result<ToolOutput, StoreError> {
        let tool = tool_name(program);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in secrets {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::ToolUnavailable {
                    tool: tool.clone(),
                    detail: e.to_string(),
                }
            } else {
                StoreError::ExternalTool {
                    tool: tool.clone(),
                    detail: format!("failed to spawn: {}", e),
                }
            }
        })?;

        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let output = ToolOutput {
                    status: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                tracing::debug!(tool = %tool, status = ?output.status, "Tool finished");
                Ok(output)
            }
            Ok(Err(e)) => Err(StoreError::ExternalTool {
                tool,
                detail: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!(tool = %tool, timeout_secs = self.timeout.as_secs(), "Tool timed out");
                Err(StoreError::Timeout {
                    tool,
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(None, None, DEFAULT_TOOL_TIMEOUT)
    }
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or_else(|| program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

// ─── Keytool Discovery ───────────────────────────────────────────────────────

fn discover_keytool() -> Option<PathBuf> {
    let mut roots: Vec<PathBuf> = JVM_ROOTS.iter().map(PathBuf::from).collect();
    if let Some(home) = dirs_next::home_dir() {
        roots.push(home.join(".sdkman").join("candidates").join("java"));
    }
    find_keytool(
        env::var_os("PATH").as_deref(),
        env::var_os("JAVA_HOME").as_deref(),
        &roots,
    )
}

/// Search order: PATH, `$JAVA_HOME/bin`, then every JVM under `roots`
/// (newest-looking directory name first).
fn find_keytool(path_var: Option<&OsStr>, java_home: Option<&OsStr>, roots: &[PathBuf]) -> Option<PathBuf> {
    let exe = if cfg!(windows) { "keytool.exe" } else { "keytool" };

    if let Some(paths) = path_var {
        if let Some(found) = env::split_paths(paths)
            .map(|dir| dir.join(exe))
            .find(|candidate| candidate.is_file())
        {
            return Some(found);
        }
    }

    if let Some(home) = java_home {
        let candidate = Path::new(home).join("bin").join(exe);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    for root in roots {
        let Ok(entries) = fs::read_dir(root) else {
            continue;
        };
        let mut jvms: Vec<PathBuf> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        jvms.sort();
        for jvm in jvms.iter().rev() {
            for candidate in [
                jvm.join("bin").join(exe),
                jvm.join("Contents").join("Home").join("bin").join(exe),
            ] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_keytool(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let exe = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        let path = dir.join(exe);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        path
    }

    #[test]
    fn test_find_keytool_prefers_path() {
        let tmp = tempfile::tempdir().unwrap();
        let on_path = fake_keytool(&tmp.path().join("bin"));
        let java_home = tmp.path().join("jdk");
        fake_keytool(&java_home.join("bin"));

        let path_var = env::join_paths([tmp.path().join("bin")]).unwrap();
        let found = find_keytool(Some(path_var.as_os_str()), Some(java_home.as_os_str()), &[]);
        assert_eq!(found, Some(on_path));
    }

    #[test]
    fn test_find_keytool_falls_back_to_java_home_then_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let java_home = tmp.path().join("jdk");
        let in_home = fake_keytool(&java_home.join("bin"));
        assert_eq!(
            find_keytool(None, Some(java_home.as_os_str()), &[]),
            Some(in_home)
        );

        let root = tmp.path().join("jvm");
        fake_keytool(&root.join("java-11").join("bin"));
        let newest = fake_keytool(&root.join("java-17").join("bin"));
        assert_eq!(find_keytool(None, None, &[root]), Some(newest));
    }

    #[test]
    fn test_find_keytool_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_keytool(None, None, &[tmp.path().to_path_buf()]), None);
    }

    #[test]
    fn test_output_detail_prefers_stderr() {
        let output = ToolOutput {
            status: Some(1),
            stdout: "ignored".into(),
            stderr: "keytool error: java.io.IOException: Keystore was tampered with\n".into(),
        };
        assert!(!output.success());
        assert_eq!(
            output.detail(),
            "exit 1: keytool error: java.io.IOException: Keystore was tampered with"
        );
    }

    #[test]
    fn test_missing_keytool_is_unavailable() {
        let toolchain = Toolchain {
            keytool: None,
            openssl: PathBuf::from("openssl"),
            timeout: DEFAULT_TOOL_TIMEOUT,
        };
        assert!(matches!(
            toolchain.keytool(),
            Err(StoreError::ToolUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_missing_program_is_unavailable() {
        let toolchain = Toolchain::new(None, None, Duration::from_secs(5));
        let result = toolchain
            .run(Path::new("/nonexistent/trustward-tool"), &[], &[])
            .await;
        assert!(matches!(result, Err(StoreError::ToolUnavailable { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out_slow_tool() {
        let toolchain = Toolchain::new(None, None, Duration::from_millis(100));
        let started = std::time::Instant::now();
        let result = toolchain.run(Path::new("sleep"), &["5".into()], &[]).await;

        match result {
            Err(StoreError::Timeout { tool, timeout }) => {
                assert_eq!(tool, "sleep");
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
