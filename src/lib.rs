// Core modules
pub mod capture;
pub mod flow;
pub mod service;
pub mod device;
pub mod common;

// Re-export commonly used types
pub use common::{Config, FaceIdError, Result};
pub use capture::{
    Acquisition, CameraDevice, CaptureDevice, CaptureError, CapturedImage, Capability,
    GalleryPicker, PermissionGate, PermissionPrompt, PermissionState,
};
pub use flow::{
    BlockReason, FlowError, LoginFlow, Navigation, Notice, NoticeKind, Pending,
    RegistrationFlow, Screen, ScreenView, Slot, Transition,
};
pub use service::{
    Recognized, RecognitionRequest, Registered, RegistrationRequest, SubmissionClient,
    SubmissionFailure, SubmissionOutcome, Submitter, UserId,
};
