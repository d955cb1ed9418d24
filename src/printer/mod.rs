//! # Printer Client
//!
//! Turns a rendered bitmap into the device's required file encoding and
//! submits it as an IPP print job through the external tool interface.
//!
//! One call, one delivery attempt: failures are logged and reported as a
//! boolean, and retry policy (there is none) belongs to the caller. The
//! transient BMP is removed after submission regardless of outcome.

pub mod bmp;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ipp::{IppTools, PrinterEndpoint};
use crate::render::RenderedImage;

/// Content-type hint the device expects for its 1-bpp BMP encoding.
pub const BMP_CONTENT_TYPE: &str = "image/reverse-encoding-bmp";

/// Submits rendered images to a printer endpoint.
pub struct PrintClient {
    tools: Arc<dyn IppTools>,
    workdir: PathBuf,
}

impl PrintClient {
    /// Create a client writing transient job files into `workdir`.
    pub fn new(tools: Arc<dyn IppTools>, workdir: PathBuf) -> Self {
        Self { tools, workdir }
    }

    /// Encode and submit one print job. Returns true on success.
    ///
    /// Expected failures (encoding, tool rejection) are logged here and
    /// reported as false; they never propagate as errors.
    pub async fn print_image(
        &self,
        endpoint: &PrinterEndpoint,
        image: &RenderedImage,
        job_name: &str,
    ) -> bool {
        let data = bmp::encode_bmp1(image.bitmap());
        let file = self
            .workdir
            .join(format!("{}-{}.bmp", sanitize(job_name), Uuid::new_v4()));

        if let Err(e) = fs::write(&file, &data).await {
            error!(path = %file.display(), error = %e, "failed to write job file");
            return false;
        }

        let result = self
            .tools
            .submit(endpoint, &file, BMP_CONTENT_TYPE, job_name)
            .await;

        if let Err(e) = fs::remove_file(&file).await {
            warn!(path = %file.display(), error = %e, "failed to remove job file");
        }

        match result {
            Ok(()) => {
                info!(job = job_name, content = image.label(), uri = %endpoint.uri, "print job successful");
                true
            }
            Err(e) => {
                error!(job = job_name, uri = %endpoint.uri, error = %e, "print job failed");
                false
            }
        }
    }
}

/// Reduce a job name to a filesystem-safe stem.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    use crate::error::StickyError;
    use crate::render::{font::FontKind, RenderConfig, Renderer};

    /// Records each submission and can be told to accept or reject.
    struct RecordingTools {
        accept: bool,
        submissions: Mutex<Vec<(String, String, String, bool)>>,
    }

    impl RecordingTools {
        fn new(accept: bool) -> Arc<Self> {
            Arc::new(Self {
                accept,
                submissions: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl IppTools for RecordingTools {
        async fn discover(&self) -> Vec<PrinterEndpoint> {
            Vec::new()
        }

        async fn verify(&self, _endpoint: &PrinterEndpoint) -> bool {
            true
        }

        async fn submit(
            &self,
            endpoint: &PrinterEndpoint,
            file: &Path,
            content_type: &str,
            job_name: &str,
        ) -> Result<(), StickyError> {
            self.submissions.lock().unwrap().push((
                endpoint.uri.clone(),
                content_type.to_string(),
                job_name.to_string(),
                file.exists(),
            ));
            if self.accept {
                Ok(())
            } else {
                Err(StickyError::Printer("print job rejected: no paper".into()))
            }
        }
    }

    fn test_image() -> RenderedImage {
        Renderer::new(RenderConfig::default()).render_text("hi", FontKind::Sans, "test")
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let dir = tempfile::tempdir().unwrap();
        let tools = RecordingTools::new(true);
        let client = PrintClient::new(tools.clone(), dir.path().to_path_buf());
        let endpoint = PrinterEndpoint::new("10.0.0.5", 631, "/ipp/print");

        assert!(client.print_image(&endpoint, &test_image(), "Note").await);

        let submissions = tools.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        let (uri, content_type, job, file_existed) = &submissions[0];
        assert_eq!(uri, "ipp://10.0.0.5:631/ipp/print");
        assert_eq!(content_type, BMP_CONTENT_TYPE);
        assert_eq!(job, "Note");
        assert!(file_existed, "job file must exist during submission");
    }

    #[tokio::test]
    async fn test_failed_submission_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let tools = RecordingTools::new(false);
        let client = PrintClient::new(tools, dir.path().to_path_buf());
        let endpoint = PrinterEndpoint::new("10.0.0.5", 631, "/ipp/print");

        assert!(!client.print_image(&endpoint, &test_image(), "Note").await);
    }

    #[tokio::test]
    async fn test_transient_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let tools = RecordingTools::new(true);
        let client = PrintClient::new(tools, dir.path().to_path_buf());
        let endpoint = PrinterEndpoint::new("10.0.0.5", 631, "/ipp/print");

        client.print_image(&endpoint, &test_image(), "Note").await;

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "bmp"))
            .collect();
        assert!(leftovers.is_empty(), "BMP job files must be cleaned up");
    }

    #[test]
    fn test_sanitize_job_names() {
        assert_eq!(sanitize("Note"), "Note");
        assert_eq!(sanitize("my job/../x"), "my_job____x");
        assert_eq!(sanitize(""), "job");
    }
}
