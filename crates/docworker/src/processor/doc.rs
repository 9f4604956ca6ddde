//! Legacy Word (`.doc`) extraction through the external `antiword` tool.

use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::error::ProcessError;

/// Characters of antiword's stderr kept in error messages.
const MAX_STDERR_CHARS: usize = 200;

pub struct DocExtractor {
    antiword_path: String,
    timeout: Duration,
}

impl DocExtractor {
    pub fn new(antiword_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            antiword_path: antiword_path.into(),
            timeout,
        }
    }

    pub async fn extract(&self, bytes: &[u8]) -> Result<String, ProcessError> {
        let file = NamedTempFile::with_suffix(".doc").map_err(|e| ProcessError::TempFile {
            path: std::env::temp_dir(),
            source: e,
        })?;
        tokio::fs::write(file.path(), bytes)
            .await
            .map_err(|e| ProcessError::TempFile {
                path: file.path().to_path_buf(),
                source: e,
            })?;

        let child = Command::new(&self.antiword_path)
            .args(["-m", "UTF-8.txt", "-w", "0"])
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProcessError::DocProcessing(format!(
                    "Failed to run {}: {}. Make sure antiword is installed.",
                    self.antiword_path, e
                ))
            })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                ProcessError::DocProcessing(format!("Failed to wait for antiword: {}", e))
            })?,
            Err(_) => {
                return Err(ProcessError::DocProcessing(format!(
                    "antiword timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(ProcessError::DocProcessing(format!(
                "antiword failed: {}",
                detail
            )));
        }

        tracing::debug!(bytes = bytes.len(), "antiword converted document");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
