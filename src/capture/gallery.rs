use std::sync::Arc;
use tracing::debug;
use crate::capture::permission::{Capability, PermissionGate, PermissionPrompt, PermissionState};
use crate::capture::{Acquisition, CaptureError};

/// System photo picker.
#[allow(async_fn_in_trait)]
pub trait GalleryPicker {
    async fn pick(&self) -> Result<Acquisition, CaptureError>;
}

impl<T: GalleryPicker> GalleryPicker for Arc<T> {
    async fn pick(&self) -> Result<Acquisition, CaptureError> {
        (**self).pick().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickFailure {
    /// Access not granted; the picker was never opened.
    NotPermitted(PermissionState),
    Device(CaptureError),
}

/// Ensure gallery access, then open the picker.
pub async fn pick_image<P, G>(gate: &PermissionGate<P>, picker: &G) -> Result<Acquisition, PickFailure>
where
    P: PermissionPrompt,
    G: GalleryPicker,
{
    let permission = gate.ensure(Capability::Gallery).await;
    if !permission.is_granted() {
        debug!("Gallery pick aborted, permission {:?}", permission);
        return Err(PickFailure::NotPermitted(permission));
    }
    picker.pick().await.map_err(PickFailure::Device)
}
