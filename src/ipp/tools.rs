//! # CUPS Tool Invocation
//!
//! Production [`IppTools`] implementation shelling out to `ippfind` (mDNS
//! service discovery) and `ipptool` (status queries and Print-Job
//! submission). Every invocation is bounded by a timeout; on expiry the
//! child process is killed and reaped so no orphans are left behind.
//!
//! The `ipptool` test files describing the Get-Printer-Attributes and
//! Print-Job operations are embedded in the binary and written into the
//! tool working directory on construction.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::StickyError;

use super::{IppTools, PrinterEndpoint};

/// Timeout for verification and submission calls.
const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// ipptool script for a minimal status query.
const GET_PRINTER_ATTRIBUTES_TEST: &str = r#"{
    NAME "Get Printer Attributes"
    OPERATION Get-Printer-Attributes
    GROUP operation-attributes-tag
    ATTR charset attributes-charset utf-8
    ATTR language attributes-natural-language en
    ATTR uri printer-uri $uri
    STATUS successful-ok
}
"#;

/// ipptool script submitting the file passed with `-f` as a print job.
const PRINT_JOB_TEST: &str = r#"{
    NAME "Print Job"
    OPERATION Print-Job
    GROUP operation-attributes-tag
    ATTR charset attributes-charset utf-8
    ATTR language attributes-natural-language en
    ATTR uri printer-uri $uri
    ATTR name requesting-user-name $user
    ATTR name job-name "$jobname"
    ATTR keyword media-type $filetype
    STATUS successful-ok
    STATUS successful-ok-ignored-or-substituted-attributes
}
"#;

/// Captured result of a finished tool invocation.
struct ToolOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// [`IppTools`] implementation backed by the CUPS command-line tools.
pub struct CupsTools {
    ippfind_bin: String,
    ipptool_bin: String,
    discovery_timeout: Duration,
    attributes_test: PathBuf,
    print_job_test: PathBuf,
}

impl CupsTools {
    /// Create a tool wrapper, materializing the embedded ipptool test files
    /// into `workdir`.
    pub fn new(discovery_timeout: Duration, workdir: &Path) -> Result<Self, StickyError> {
        let attributes_test = workdir.join("get-printer-attributes.test");
        let print_job_test = workdir.join("print-job.test");
        std::fs::write(&attributes_test, GET_PRINTER_ATTRIBUTES_TEST)?;
        std::fs::write(&print_job_test, PRINT_JOB_TEST)?;

        Ok(Self {
            ippfind_bin: "ippfind".to_string(),
            ipptool_bin: "ipptool".to_string(),
            discovery_timeout,
            attributes_test,
            print_job_test,
        })
    }

    /// Parse discovery output: one endpoint per matching line, everything
    /// else ignored.
    fn parse_discover_output(output: &str) -> Vec<PrinterEndpoint> {
        output
            .lines()
            .filter_map(PrinterEndpoint::parse_uri)
            .collect()
    }
}

#[async_trait]
impl IppTools for CupsTools {
    async fn discover(&self) -> Vec<PrinterEndpoint> {
        info!("starting IPP printer discovery");
        let mut cmd = Command::new(&self.ippfind_bin);

        match run_with_timeout(&mut cmd, self.discovery_timeout).await {
            Ok(output) if output.success => {
                let printers = Self::parse_discover_output(&output.stdout);
                info!(count = printers.len(), "discovered IPP printers");
                printers
            }
            Ok(output) => {
                // ippfind exits non-zero when nothing answered; treat it the
                // same as an empty result.
                debug!(stderr = %output.stderr.trim(), "ippfind returned no printers");
                Vec::new()
            }
            Err(StickyError::ToolTimeout(t)) => {
                warn!(timeout = ?t, "printer discovery timed out");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "printer discovery failed; is CUPS installed?");
                Vec::new()
            }
        }
    }

    async fn verify(&self, endpoint: &PrinterEndpoint) -> bool {
        let mut cmd = Command::new(&self.ipptool_bin);
        cmd.arg("-t")
            .arg(&endpoint.uri)
            .arg(&self.attributes_test);

        match run_with_timeout(&mut cmd, TOOL_TIMEOUT).await {
            Ok(output) if output.success => {
                info!(uri = %endpoint.uri, "printer is accessible");
                true
            }
            Ok(output) => {
                warn!(uri = %endpoint.uri, stderr = %output.stderr.trim(), "printer verification failed");
                false
            }
            Err(e) => {
                warn!(uri = %endpoint.uri, error = %e, "printer verification failed");
                false
            }
        }
    }

    async fn submit(
        &self,
        endpoint: &PrinterEndpoint,
        file: &Path,
        content_type: &str,
        job_name: &str,
    ) -> Result<(), StickyError> {
        info!(uri = %endpoint.uri, job = job_name, "submitting print job");

        let mut cmd = Command::new(&self.ipptool_bin);
        cmd.arg("-v")
            .arg("-t")
            .arg("-f")
            .arg(file)
            .arg(&endpoint.uri)
            .arg("-d")
            .arg(format!("filetype={}", content_type))
            .arg("-d")
            .arg(format!("jobname={}", job_name))
            .arg(&self.print_job_test);

        let output = run_with_timeout(&mut cmd, TOOL_TIMEOUT).await?;
        if output.success {
            debug!(stdout = %output.stdout.trim(), "ipptool output");
            Ok(())
        } else {
            Err(StickyError::Printer(format!(
                "print job rejected: {}",
                collapse(&output.stderr, &output.stdout)
            )))
        }
    }
}

/// Pick the more informative of stderr/stdout for diagnostics.
fn collapse(stderr: &str, stdout: &str) -> String {
    let err = stderr.trim();
    if err.is_empty() {
        stdout.trim().to_string()
    } else {
        err.to_string()
    }
}

/// Run a command with a hard wall-clock bound.
///
/// On timeout the child is killed and awaited before returning, so the
/// process table stays clean. Output pipes are drained concurrently with the
/// wait to avoid blocking a chatty child on a full pipe.
async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<ToolOutput, StickyError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let stdout_task = child.stdout.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    });
    let stderr_task = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            buf
        })
    });

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            // kill() also reaps the child, leaving no zombie behind.
            let _ = child.kill().await;
            return Err(StickyError::ToolTimeout(timeout));
        }
    };

    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    Ok(ToolOutput {
        success: status.success(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
