pub mod camera;
pub mod gallery;
pub mod permission;

pub use camera::{CameraDevice, CameraSession, CameraState, CaptureResolution, CaptureTicket};
pub use gallery::{pick_image, GalleryPicker, PickFailure};
pub use permission::{Capability, PermissionGate, PermissionPrompt, PermissionState};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything a screen needs from the device: permission prompts, camera and gallery.
pub trait CaptureDevice: PermissionPrompt + CameraDevice + GalleryPicker {}

impl<T: PermissionPrompt + CameraDevice + GalleryPicker> CaptureDevice for T {}

const FALLBACK_FILENAME: &str = "image.jpg";

/// A photo produced by the camera or picked from the gallery.
///
/// Immutable: retaking or clearing replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    uri: String,
    filename: String,
    mime_type: String,
}

impl CapturedImage {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let filename = uri
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let mime_type = mime_for(&filename).to_string();
        Self { uri, filename, mime_type }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::from_uri(path.to_string_lossy().into_owned())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Filesystem location behind the uri (`file://` prefix stripped).
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.uri.strip_prefix("file://").unwrap_or(&self.uri))
    }
}

fn mime_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "heic" => "image/heic",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Result of one acquisition attempt. Backing out is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Captured(CapturedImage),
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Capture device unavailable: {0}")]
    Unavailable(String),

    #[error("Capture failed: {0}")]
    Failed(String),
}
