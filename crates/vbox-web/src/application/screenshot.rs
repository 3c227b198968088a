//! Screenshot capture with a guaranteed-renderable fallback.
//!
//! `VBoxManage controlvm <vm> screenshotpng <file>` writes a PNG to disk.
//! The service picks a unique file under the configured directory, asks the
//! gateway to fill it, reads it back, and deletes it.
//!
//! Capture never fails from the caller's point of view.  A stopped VM, a
//! missing CLI, a timeout, or an unreadable file all produce the same fixed
//! SVG placeholder, so the dashboard always has something to draw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use vbox_core::protocol::commands;
use vbox_core::VmName;

use crate::domain::{ImageFormat, Screenshot};
use crate::infrastructure::gateway::{GatewayError, HypervisorGateway};

/// The "No Image available" placeholder, 300×200.
pub const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200" viewBox="0 0 300 200">"##,
    r##"<rect width="300" height="200" fill="#2b2b2b"/>"##,
    r##"<text x="150" y="105" font-family="sans-serif" font-size="20" fill="#d0d0d0" text-anchor="middle">No Image available</text>"##,
    "</svg>",
);

#[derive(Debug, Error)]
enum CaptureError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("could not read capture file: {0}")]
    Read(#[from] std::io::Error),
    #[error("capture file was empty")]
    Empty,
}

/// Captures VM screens through the gateway.
pub struct ScreenshotService {
    gateway: Arc<dyn HypervisorGateway>,
    dir: PathBuf,
    timeout: Duration,
}

impl ScreenshotService {
    pub fn new(gateway: Arc<dyn HypervisorGateway>, dir: PathBuf, timeout: Duration) -> Self {
        Self {
            gateway,
            dir,
            timeout,
        }
    }

    /// The placeholder image; identical on every call.
    pub fn placeholder() -> Screenshot {
        Screenshot {
            bytes: PLACEHOLDER_SVG.as_bytes().to_vec(),
            format: ImageFormat::Svg,
            placeholder: true,
        }
    }

    /// Captures `vm`'s screen, or returns the placeholder on any failure.
    ///
    /// The caller is expected to hold `vm`'s lock.
    pub async fn capture(&self, vm: &VmName) -> Screenshot {
        match self.try_capture(vm).await {
            Ok(bytes) => Screenshot {
                bytes,
                format: ImageFormat::Png,
                placeholder: false,
            },
            Err(e) => {
                debug!(vm = %vm, error = %e, "screenshot unavailable, serving placeholder");
                Self::placeholder()
            }
        }
    }

    async fn try_capture(&self, vm: &VmName) -> Result<Vec<u8>, CaptureError> {
        let path = self.dir.join(format!("vbox-web-{}.png", Uuid::new_v4()));

        let result = self
            .gateway
            .execute(&commands::screenshot_png(vm, &path), self.timeout)
            .await;
        let bytes = match result {
            Ok(_) => tokio::fs::read(&path).await.map_err(CaptureError::from),
            Err(e) => Err(e.into()),
        };

        // The CLI may have written a partial file before failing.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "could not remove capture file");
            }
        }

        let bytes = bytes?;
        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(bytes)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::gateway::CommandOutput;
    use crate::infrastructure::scripted::ScriptedGateway;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn vm(name: &str) -> VmName {
        VmName::parse(name).unwrap()
    }

    /// A gateway that writes `PNG_MAGIC` to the path named in the last argument.
    fn writing_gateway() -> Arc<ScriptedGateway> {
        Arc::new(ScriptedGateway::new(|args| {
            let path = args.last().cloned().unwrap_or_default();
            std::fs::write(path, PNG_MAGIC).map_err(GatewayError::Io)?;
            Ok(CommandOutput::success(Vec::new()))
        }))
    }

    #[tokio::test]
    async fn test_successful_capture_returns_png_and_removes_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let gateway = writing_gateway();
        let service =
            ScreenshotService::new(gateway.clone(), dir.path().to_path_buf(), Duration::from_secs(1));

        // Act
        let shot = service.capture(&vm("dev")).await;

        // Assert
        assert!(!shot.placeholder);
        assert_eq!(shot.format, ImageFormat::Png);
        assert_eq!(shot.bytes, PNG_MAGIC);
        let calls = gateway.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][..3], ["controlvm", "dev", "screenshotpng"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Err(GatewayError::Timeout {
                after: Duration::from_secs(1),
            })
        }));
        let service = ScreenshotService::new(gateway, dir.path().to_path_buf(), Duration::from_secs(1));

        let shot = service.capture(&vm("dev")).await;

        assert!(shot.placeholder);
        assert_eq!(shot.format, ImageFormat::Svg);
    }

    #[tokio::test]
    async fn test_missing_file_yields_placeholder() {
        // The CLI "succeeds" but writes nothing.
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(ScriptedGateway::new(|_| Ok(CommandOutput::default())));
        let service = ScreenshotService::new(gateway, dir.path().to_path_buf(), Duration::from_secs(1));

        assert!(service.capture(&vm("dev")).await.placeholder);
    }

    #[tokio::test]
    async fn test_empty_file_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(ScriptedGateway::new(|args| {
            std::fs::write(args.last().cloned().unwrap_or_default(), b"").map_err(GatewayError::Io)?;
            Ok(CommandOutput::default())
        }));
        let service = ScreenshotService::new(gateway, dir.path().to_path_buf(), Duration::from_secs(1));

        assert!(service.capture(&vm("dev")).await.placeholder);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_placeholder_is_byte_identical_across_calls() {
        let a = ScreenshotService::placeholder();
        let b = ScreenshotService::placeholder();
        assert_eq!(a, b);
        let text = String::from_utf8(a.bytes).unwrap();
        assert!(text.contains("No Image available"));
        assert!(text.contains(r#"width="300""#));
        assert!(text.contains(r#"height="200""#));
    }

    #[tokio::test]
    async fn test_each_capture_uses_a_fresh_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = writing_gateway();
        let service =
            ScreenshotService::new(gateway.clone(), dir.path().to_path_buf(), Duration::from_secs(1));

        service.capture(&vm("dev")).await;
        service.capture(&vm("dev")).await;

        let calls = gateway.invocations();
        assert_ne!(calls[0][3], calls[1][3]);
    }
}
