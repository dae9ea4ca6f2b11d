use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::capture::permission::{Capability, PermissionGate, PermissionPrompt, PermissionState};
use crate::capture::{CaptureError, CapturedImage};

/// Live camera with a single shutter action.
#[allow(async_fn_in_trait)]
pub trait CameraDevice {
    async fn capture(&self) -> Result<CapturedImage, CaptureError>;
}

impl<T: CameraDevice> CameraDevice for Arc<T> {
    async fn capture(&self) -> Result<CapturedImage, CaptureError> {
        (**self).capture().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    Inactive,
    Active,
    Captured(CapturedImage),
    Cancelled,
}

/// Tickets are unique across sessions, so a reopened camera never accepts an old shot.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one shutter press; a ticket outlived by `cancel` resolves as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResolution {
    Captured(CapturedImage),
    /// Still `Active`; the user may press the shutter again.
    Failed(CaptureError),
    /// Session was cancelled or a newer capture replaced this one.
    Stale,
}

/// `Inactive -> Active -> (Captured | Cancelled)`.
///
/// Transitions are synchronous so the session can sit inside a screen's locked state while
/// the actual shutter future runs outside the lock.
#[derive(Debug, Clone)]
pub struct CameraSession {
    state: CameraState,
    in_flight: Option<u64>,
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSession {
    pub fn new() -> Self {
        Self {
            state: CameraState::Inactive,
            in_flight: None,
        }
    }

    /// Consults the gate and returns an `Active` session, or an `Inactive` one if the
    /// camera permission was not granted.
    pub async fn open<P: PermissionPrompt>(gate: &PermissionGate<P>) -> Self {
        Self::from_permission(gate.ensure(Capability::Camera).await)
    }

    /// `Active` only for a granted camera permission.
    pub fn from_permission(permission: PermissionState) -> Self {
        let mut session = Self::new();
        if permission.is_granted() {
            session.activate();
        } else {
            debug!("Camera stays inactive, permission {:?}", permission);
        }
        session
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CameraState::Active
    }

    pub fn is_capturing(&self) -> bool {
        self.in_flight.is_some()
    }

    fn activate(&mut self) {
        self.state = CameraState::Active;
        self.in_flight = None;
    }

    /// Press the shutter. `None` unless active with no capture already running.
    pub fn begin_capture(&mut self) -> Option<CaptureTicket> {
        if !self.is_active() || self.in_flight.is_some() {
            return None;
        }
        let ticket = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        self.in_flight = Some(ticket);
        Some(CaptureTicket(ticket))
    }

    pub fn complete_capture(
        &mut self,
        ticket: CaptureTicket,
        result: Result<CapturedImage, CaptureError>,
    ) -> CaptureResolution {
        if !self.is_active() || self.in_flight != Some(ticket.0) {
            debug!("Discarding capture result for stale ticket {}", ticket.0);
            return CaptureResolution::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(image) => {
                self.state = CameraState::Captured(image.clone());
                CaptureResolution::Captured(image)
            }
            Err(e) => {
                warn!("Capture failed, camera stays active: {}", e);
                CaptureResolution::Failed(e)
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.is_active() {
            self.state = CameraState::Cancelled;
            self.in_flight = None;
        }
    }

    /// Capture with exclusive access to the session.
    pub async fn capture_with<C: CameraDevice>(&mut self, camera: &C) -> CaptureResolution {
        match self.begin_capture() {
            Some(ticket) => {
                let result = camera.capture().await;
                self.complete_capture(ticket, result)
            }
            None => CaptureResolution::Stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedPrompt(PermissionState);

    impl PermissionPrompt for FixedPrompt {
        async fn status(&self, _capability: Capability) -> PermissionState {
            self.0
        }

        async fn request(&self, _capability: Capability) -> PermissionState {
            self.0
        }
    }

    struct FlakyCamera {
        failures_left: Mutex<u32>,
    }

    impl CameraDevice for FlakyCamera {
        async fn capture(&self) -> Result<CapturedImage, CaptureError> {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(CaptureError::Failed("sensor busy".into()));
            }
            Ok(CapturedImage::from_uri("/tmp/shot.jpg"))
        }
    }

    #[tokio::test]
    async fn denied_permission_keeps_inactive() {
        let gate = PermissionGate::new(FixedPrompt(PermissionState::Denied));
        let mut session = CameraSession::open(&gate).await;
        assert_eq!(session.state(), &CameraState::Inactive);
        assert!(session.begin_capture().is_none());
    }

    #[tokio::test]
    async fn failure_stays_active_then_captures() {
        let gate = PermissionGate::new(FixedPrompt(PermissionState::Granted));
        let camera = FlakyCamera { failures_left: Mutex::new(1) };
        let mut session = CameraSession::open(&gate).await;
        assert!(session.is_active());

        let first = session.capture_with(&camera).await;
        assert!(matches!(first, CaptureResolution::Failed(_)));
        assert!(session.is_active());

        let second = session.capture_with(&camera).await;
        assert_eq!(
            second,
            CaptureResolution::Captured(CapturedImage::from_uri("/tmp/shot.jpg"))
        );
        assert!(matches!(session.state(), CameraState::Captured(_)));
    }

    #[test]
    fn cancel_discards_in_flight_capture() {
        let mut session = CameraSession::new();
        session.activate();
        let ticket = session.begin_capture().unwrap();
        assert!(session.begin_capture().is_none());

        session.cancel();
        assert_eq!(session.state(), &CameraState::Cancelled);
        let late = session.complete_capture(ticket, Ok(CapturedImage::from_uri("/tmp/late.jpg")));
        assert_eq!(late, CaptureResolution::Stale);
        assert_eq!(session.state(), &CameraState::Cancelled);
    }

    #[test]
    fn reopened_camera_ignores_old_ticket() {
        let mut old = CameraSession::from_permission(PermissionState::Granted);
        let stale = old.begin_capture().unwrap();
        old.cancel();

        let mut reopened = CameraSession::from_permission(PermissionState::Granted);
        let fresh = reopened.begin_capture().unwrap();
        assert_ne!(stale, fresh);

        let late = reopened.complete_capture(stale, Ok(CapturedImage::from_uri("/tmp/old.jpg")));
        assert_eq!(late, CaptureResolution::Stale);
        assert!(reopened.is_capturing());
    }
}
