pub mod login;
pub mod registration;
pub mod screen;

pub use login::LoginFlow;
pub use registration::RegistrationFlow;
pub use screen::{AcquisitionState, Screen};

use thiserror::Error;
use crate::capture::{CaptureError, CapturedImage, Capability};
use crate::service::SubmissionFailure;

pub const SUCCESS_TITLE: &str = "Success!";
pub const PERMISSION_DENIED_TITLE: &str = "Permission Denied";
pub const CAPTURE_FAILED_TITLE: &str = "Camera Error";
pub const INCOMPLETE_TITLE: &str = "Error";

/// Everything a screen turns into an error notice. None of these is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Permission to use the {0} was denied")]
    PermissionDenied(Capability),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Submit refused, required input is missing")]
    Incomplete,

    #[error("Network error: {0}")]
    TransportFailure(String),

    #[error("Service rejected the request: {}", .0.as_deref().unwrap_or("no detail"))]
    ServiceRejection(Option<String>),
}

impl From<&SubmissionFailure> for FlowError {
    fn from(failure: &SubmissionFailure) -> Self {
        match failure {
            SubmissionFailure::Transport(detail) => FlowError::TransportFailure(detail.clone()),
            SubmissionFailure::Rejected { detail, .. } => FlowError::ServiceRejection(detail.clone()),
        }
    }
}

impl From<CaptureError> for FlowError {
    fn from(e: CaptureError) -> Self {
        FlowError::CaptureFailed(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error(FlowError),
}

/// Alert shown to the user until dismissed or acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: SUCCESS_TITLE.to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }

    pub fn error(&self) -> Option<&FlowError> {
        match &self.kind {
            NoticeKind::Error(e) => Some(e),
            NoticeKind::Success => None,
        }
    }

    pub(crate) fn permission_denied(capability: Capability) -> Self {
        Self {
            kind: NoticeKind::Error(FlowError::PermissionDenied(capability)),
            title: PERMISSION_DENIED_TITLE.to_string(),
            message: format!("We need permission to access your {}.", capability),
        }
    }

    pub(crate) fn capture_failed(e: CaptureError) -> Self {
        let message = format!("{}. Please try again.", e);
        Self {
            kind: NoticeKind::Error(e.into()),
            title: CAPTURE_FAILED_TITLE.to_string(),
            message,
        }
    }

    pub(crate) fn incomplete(message: &str) -> Self {
        Self {
            kind: NoticeKind::Error(FlowError::Incomplete),
            title: INCOMPLETE_TITLE.to_string(),
            message: message.to_string(),
        }
    }

    /// `fallback` is shown when the service refused without saying why.
    pub(crate) fn submission_failed(title: &str, failure: &SubmissionFailure, fallback: &str) -> Self {
        let error = FlowError::from(failure);
        let message = match &error {
            FlowError::TransportFailure(detail) => {
                format!("{}. Check your connection and try again.", detail)
            }
            FlowError::ServiceRejection(Some(detail)) => detail.clone(),
            _ => fallback.to_string(),
        };
        Self {
            kind: NoticeKind::Error(error),
            title: title.to_string(),
            message,
        }
    }
}

/// Which controls occupy the screen's single acquisition slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    AcquisitionControls,
    Viewfinder,
    Preview(CapturedImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    PermissionPrompt,
    Capture,
    GalleryPick,
    Submission,
}

/// Snapshot for rendering a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub slot: Slot,
    pub pending: Option<Pending>,
    pub notice: Option<Notice>,
    pub submit_enabled: bool,
}

/// What happened to a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// User backed out of the camera or the picker; nothing changed.
    Cancelled,
    /// Action ran and failed; an error notice is showing.
    Failed(FlowError),
    /// Action refused before anything ran.
    Blocked(BlockReason),
    /// Result arrived after the screen went away, or after the camera was cancelled.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Another acquisition or submission is still running.
    Busy,
    /// Control not on screen in the current acquisition state.
    NotAvailable,
    /// Image, name or email missing.
    Incomplete,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    BackToEntry,
}
