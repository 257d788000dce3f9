//! External transfer tool integration

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::DownloadError;

/// Fetches a list of URLs into a directory
///
/// Implementations own retry and resume; callers only supply the work list.
#[async_trait]
pub trait TransferTool: Send + Sync {
    /// Download every URL into `output_dir`
    async fn transfer(&self, urls: &[String], output_dir: &Path) -> Result<(), DownloadError>;
}

/// [`TransferTool`] running `aria2c`
///
/// Invoked as `aria2c -c -d <dir> -Z -j <parallel> --input-file=-` with one
/// URL per line on stdin: `-c` resumes partial files and skips complete ones,
/// `-j` bounds parallel downloads. The tool's stdout is piped into `debug!`
/// lines so that stdout of this process carries command output only.
#[derive(Debug, Clone)]
pub struct Aria2cTransfer {
    program: PathBuf,
    parallel: usize,
}

impl Aria2cTransfer {
    /// aria2c from `PATH` with `parallel` concurrent downloads
    pub fn new(parallel: usize) -> Self {
        Self::with_program("aria2c", parallel)
    }

    /// Use a specific aria2c binary
    pub fn with_program(program: impl Into<PathBuf>, parallel: usize) -> Self {
        Self {
            program: program.into(),
            parallel: parallel.max(1),
        }
    }

    /// Arguments passed to aria2c for `output_dir`
    pub fn args(&self, output_dir: &Path) -> Vec<String> {
        vec![
            "-c".to_string(),
            "-d".to_string(),
            output_dir.display().to_string(),
            "-Z".to_string(),
            "-j".to_string(),
            self.parallel.to_string(),
            "--console-log-level=warn".to_string(),
            "--summary-interval=0".to_string(),
            "--input-file=-".to_string(),
        ]
    }
}

#[async_trait]
impl TransferTool for Aria2cTransfer {
    async fn transfer(&self, urls: &[String], output_dir: &Path) -> Result<(), DownloadError> {
        debug!(program = %self.program.display(), urls = urls.len(), "Spawning transfer tool");

        let mut child = Command::new(&self.program)
            .args(self.args(output_dir))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DownloadError::TransferSpawn(format!("{}: {e}", self.program.display()))
            })?;

        let mut input = urls.join("\n");
        input.push('\n');

        let (write_result, read_result) = tokio::join!(
            feed_urls(child.stdin.take(), input),
            forward_output(child.stdout.take())
        );

        let status = child.wait().await?;
        let lines = read_result?;
        debug!(lines, %status, "Transfer tool finished");
        if !status.success() {
            return Err(DownloadError::TransferFailed(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        match write_result {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("Transfer tool closed stdin before reading every URL");
                Err(DownloadError::TransferFailed(
                    "transfer tool did not read the full URL list".to_string(),
                ))
            }
            Err(e) => Err(DownloadError::Io(e)),
            Ok(()) => Ok(()),
        }
    }
}

/// Write the work list and close stdin so the tool sees EOF
async fn feed_urls(stdin: Option<ChildStdin>, input: String) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    stdin.write_all(input.as_bytes()).await
}

/// Drain the tool's stdout into the log, returning the number of lines seen
async fn forward_output(stdout: Option<ChildStdout>) -> std::io::Result<usize> {
    let Some(stdout) = stdout else {
        return Ok(0);
    };

    let mut segments = BufReader::new(stdout).split(b'\n');
    let mut lines = 0;
    while let Some(segment) = segments.next_segment().await? {
        let text = String::from_utf8_lossy(&segment);
        let text = text.trim();
        if !text.is_empty() {
            lines += 1;
            debug!(output = %text, "aria2c");
        }
    }
    Ok(lines)
}
