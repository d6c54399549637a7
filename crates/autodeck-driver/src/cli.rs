//! Bridge process invocation.
//!
//! One bridge call is one short-lived process: spawn the binary with a
//! subcommand and `--json`, wait for it with a deadline, and parse stdout as
//! a single JSON document. The caller gets either that document or a
//! [`BridgeError`] carrying the stderr tail.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::BridgeError;

/// How much stderr to keep on failures.
const STDERR_TAIL: usize = 512;

/// Handle to the bridge binary.
#[derive(Debug, Clone)]
pub struct BridgeCli {
    program: String,
    base_args: Vec<String>,
    timeout_ms: u64,
}

impl BridgeCli {
    pub fn new(program: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout_ms: timeout_ms.max(1),
        }
    }

    /// Arguments placed before the subcommand on every invocation.
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run one subcommand and parse its stdout as JSON.
    pub async fn run(&self, args: &[&str]) -> Result<serde_json::Value, BridgeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(args)
            .arg("--json")
            .arg("--timeout-ms")
            .arg(self.timeout_ms.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(program = %self.program, ?args, "bridge call");

        // The bridge gets the same budget via --timeout-ms; the extra grace
        // lets it exit with its own error before we kill it.
        let deadline = Duration::from_millis(self.timeout_ms + 1_000);
        let output = timeout(deadline, cmd.output())
            .await
            .map_err(|_| BridgeError::Timeout {
                timeout_ms: self.timeout_ms,
            })?
            .map_err(|source| BridgeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = tail(&String::from_utf8_lossy(&output.stderr));
            warn!(program = %self.program, code, "bridge call failed");
            return Err(BridgeError::Exit { code, stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim()).map_err(|e| {
            BridgeError::Parse(format!("{e} (stdout: {})", tail(stdout.trim())))
        })
    }
}

fn tail(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_TAIL {
        return trimmed.to_string();
    }
    // Stay on a char boundary when cutting.
    let mut start = trimmed.len() - STDERR_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_short_text() {
        assert_eq!(tail("  small  "), "small");
    }

    #[test]
    fn test_tail_truncates_long_text() {
        let long = "x".repeat(2000);
        let tailed = tail(&long);
        assert!(tailed.starts_with("..."));
        assert_eq!(tailed.len(), STDERR_TAIL + 3);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_error() {
        let cli = BridgeCli::new("/nonexistent/devbridge-test-binary", 1_000);
        let err = cli.run(&["devices"]).await.unwrap_err();
        match err {
            BridgeError::Spawn { ref program, .. } => {
                assert!(program.contains("devbridge-test-binary"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_stdout_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bridge.sh");
        tokio::fs::write(&script, "#!/bin/sh\necho '{\"ok\": true}'\n")
            .await
            .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let cli = BridgeCli::new(script.to_string_lossy(), 5_000);
        let value = cli.run(&["devices"]).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bridge.sh");
        tokio::fs::write(&script, "#!/bin/sh\necho 'device not found' >&2\nexit 4\n")
            .await
            .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let cli = BridgeCli::new(script.to_string_lossy(), 5_000);
        let err = cli.run(&["open", "https://example.com"]).await.unwrap_err();
        match err {
            BridgeError::Exit { code, stderr } => {
                assert_eq!(code, 4);
                assert_eq!(stderr, "device not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_base_args_precede_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bridge.sh");
        tokio::fs::write(
            &script,
            "#!/bin/sh\nprintf '{\"first\": \"%s\", \"second\": \"%s\", \"third\": \"%s\"}' \"$1\" \"$2\" \"$3\"\n",
        )
        .await
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let cli = BridgeCli::new(script.to_string_lossy(), 5_000)
            .with_base_args(vec!["--serial".to_string(), "emulator-5554".to_string()]);
        let value = cli.run(&["devices"]).await.unwrap();
        assert_eq!(value["first"], "--serial");
        assert_eq!(value["second"], "emulator-5554");
        assert_eq!(value["third"], "devices");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_bridge_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bridge.sh");
        tokio::fs::write(&script, "#!/bin/sh\nsleep 30\n").await.unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let cli = BridgeCli::new(script.to_string_lossy(), 100);
        let err = cli.run(&["snapshot", "ui"]).await.unwrap_err();
        match err {
            BridgeError::Timeout { timeout_ms } => assert_eq!(timeout_ms, 100),
            other => panic!("unexpected error: {other}"),
        }
    }
}
