//! PDF engine trait and implementations
//!
//! HTML-to-PDF conversion goes through a trait so route handlers can be
//! tested without the external renderer:
//! - Real implementation driving `wkhtmltopdf` via tokio::process
//! - Mock implementation recording the HTML it was given
//! - Timeout enforcement

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use easyvol_core::config::PdfSection;

/// Page layout passed to the renderer
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub paper_size: String,
    pub orientation: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            paper_size: "A4".into(),
            orientation: "portrait".into(),
        }
    }
}

/// Error during PDF generation
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer exited with status {status}: {stderr}")]
    Renderer { status: i32, stderr: String },

    #[error("renderer timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Trait for HTML-to-PDF conversion (testable)
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn html_to_pdf(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, PdfError>;
}

/// Real engine invoking the external `wkhtmltopdf` binary.
///
/// HTML is piped through stdin and the PDF read from stdout, so nothing
/// touches the filesystem.
pub struct WkhtmltopdfEngine {
    binary: String,
    timeout_secs: u64,
}

impl WkhtmltopdfEngine {
    pub fn new(config: &PdfSection) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl PdfEngine for WkhtmltopdfEngine {
    async fn html_to_pdf(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        let mut child = Command::new(&self.binary)
            .arg("--quiet")
            .arg("--page-size")
            .arg(&options.paper_size)
            .arg("--orientation")
            .arg(&options.orientation)
            .arg("--encoding")
            .arg("utf-8")
            .arg("-") // read HTML from stdin
            .arg("-") // write PDF to stdout
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // On timeout the child future is dropped; without this the
            // renderer keeps running after the 504 is returned
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(html.as_bytes()).await?;
            // Close stdin so the renderer sees EOF
            drop(stdin);
        }

        let timeout = Duration::from_secs(self.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PdfError::Timeout {
                    seconds: self.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            return Err(PdfError::Renderer {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}

/// Mock engine for testing: records every HTML body it receives and
/// returns canned bytes.
#[derive(Default)]
pub struct MockPdfEngine {
    rendered: std::sync::Mutex<Vec<String>>,
}

impl MockPdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTML bodies passed to the engine so far.
    pub fn rendered_html(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl PdfEngine for MockPdfEngine {
    async fn html_to_pdf(&self, html: &str, _options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        self.rendered.lock().unwrap().push(html.to_owned());
        Ok(b"%PDF-1.4 mock".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_engine_records_html() {
        let mock = MockPdfEngine::new();
        let bytes = mock
            .html_to_pdf("<h1>Verbale</h1>", &PdfOptions::default())
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(mock.rendered_html(), vec!["<h1>Verbale</h1>".to_owned()]);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        struct SlowEngine;

        #[async_trait]
        impl PdfEngine for SlowEngine {
            async fn html_to_pdf(
                &self,
                _: &str,
                _: &PdfOptions,
            ) -> Result<Vec<u8>, PdfError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }

        let timeout = Duration::from_millis(10);
        let result = tokio::time::timeout(
            timeout,
            SlowEngine.html_to_pdf("<p></p>", &PdfOptions::default()),
        )
        .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_renderer() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in renderer that records its pid and hangs
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-renderer.sh");
        let pid_file = dir.path().join("renderer.pid");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nsleep 60\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = WkhtmltopdfEngine::new(&PdfSection {
            binary: script.display().to_string(),
            timeout_secs: 1,
        });
        let result = engine.html_to_pdf("<p></p>", &PdfOptions::default()).await;
        assert!(matches!(result, Err(PdfError::Timeout { seconds: 1 })));

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();

        // The kill is delivered when the child future is dropped; the
        // process must be gone (or a zombie awaiting reaping) shortly after
        let mut dead = false;
        for _ in 0..50 {
            let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid));
            match stat {
                Err(_) => {
                    dead = true;
                    break;
                }
                Ok(stat) if stat.contains(") Z ") => {
                    dead = true;
                    break;
                }
                Ok(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        assert!(dead, "renderer pid {} still running after the timeout", pid);
    }
}
