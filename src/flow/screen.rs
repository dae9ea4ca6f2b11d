use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::capture::{
    pick_image, Acquisition, CameraDevice, CameraSession, CaptureDevice, CaptureResolution,
    Capability, CapturedImage, PermissionGate, PermissionState, PickFailure,
};
use crate::flow::{
    BlockReason, FlowError, Navigation, Notice, NoticeKind, Pending, ScreenView, Slot, Transition,
};

/// Camera, preview and acquisition controls are mutually exclusive; one value says which.
#[derive(Debug, Clone)]
pub enum AcquisitionState {
    NoImage,
    CameraActive(CameraSession),
    ImageSet(CapturedImage),
}

impl AcquisitionState {
    fn slot(&self) -> Slot {
        match self {
            AcquisitionState::NoImage => Slot::AcquisitionControls,
            AcquisitionState::CameraActive(_) => Slot::Viewfinder,
            AcquisitionState::ImageSet(image) => Slot::Preview(image.clone()),
        }
    }
}

struct ScreenState {
    acquisition: AcquisitionState,
    pending: Option<Pending>,
    notice: Option<Notice>,
    disposed: bool,
}

/// Acquisition half of a screen, shared by the login and registration flows.
///
/// Every action takes `&self` and releases the state lock before awaiting the device, so a
/// second action issued while the first is suspended sees `pending` and is refused.
pub struct Screen<D> {
    label: &'static str,
    device: Arc<D>,
    gate: PermissionGate<Arc<D>>,
    state: Mutex<ScreenState>,
}

impl<D: CaptureDevice> Screen<D> {
    pub fn new(label: &'static str, device: Arc<D>) -> Self {
        Self {
            label,
            gate: PermissionGate::new(Arc::clone(&device)),
            device,
            state: Mutex::new(ScreenState {
                acquisition: AcquisitionState::NoImage,
                pending: None,
                notice: None,
                disposed: false,
            }),
        }
    }

    pub fn acquisition(&self) -> AcquisitionState {
        self.state.lock().acquisition.clone()
    }

    pub fn image(&self) -> Option<CapturedImage> {
        match &self.state.lock().acquisition {
            AcquisitionState::ImageSet(image) => Some(image.clone()),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.state.lock().pending
    }

    pub fn permission(&self, capability: Capability) -> PermissionState {
        self.gate.last_known(capability)
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Prompt for both capabilities up front instead of on first use.
    pub async fn prime_permissions(&self) {
        for capability in [Capability::Camera, Capability::Gallery] {
            let state = self.gate.ensure(capability).await;
            debug!("[{}] {} permission primed: {:?}", self.label, capability, state);
        }
    }

    /// "Take Photo": check camera permission, then show the viewfinder.
    pub async fn open_camera(&self) -> Transition {
        if let Err(reason) = self.begin(Pending::PermissionPrompt) {
            return Transition::Blocked(reason);
        }
        let session = CameraSession::open(&self.gate).await;
        self.enter_camera(session)
    }

    /// Explicit re-prompt after a denial; continues into the gated action when granted.
    pub async fn request_access(&self, capability: Capability) -> Transition {
        if let Err(reason) = self.begin(Pending::PermissionPrompt) {
            return Transition::Blocked(reason);
        }
        let permission = self.gate.request_again(capability).await;
        match capability {
            Capability::Camera => self.enter_camera(CameraSession::from_permission(permission)),
            Capability::Gallery if permission.is_granted() => {
                self.state.lock().pending = Some(Pending::GalleryPick);
                let result = pick_image(&self.gate, &self.device).await;
                self.apply_pick(result)
            }
            Capability::Gallery => self.apply_pick(Err(PickFailure::NotPermitted(permission))),
        }
    }

    pub async fn capture_photo(&self) -> Transition {
        let ticket = {
            let mut state = self.state.lock();
            if state.disposed {
                return Transition::Blocked(BlockReason::Disposed);
            }
            if state.pending.is_some() {
                return Transition::Blocked(BlockReason::Busy);
            }
            let ticket = match &mut state.acquisition {
                AcquisitionState::CameraActive(session) => session.begin_capture(),
                _ => return Transition::Blocked(BlockReason::NotAvailable),
            };
            let Some(ticket) = ticket else {
                return Transition::Blocked(BlockReason::Busy);
            };
            state.pending = Some(Pending::Capture);
            ticket
        };

        let result = self.device.capture().await;

        let mut state = self.state.lock();
        if state.disposed {
            warn!("[{}] Capture finished after the screen was closed", self.label);
            return Transition::Discarded;
        }
        let resolution = match &mut state.acquisition {
            AcquisitionState::CameraActive(session) => session.complete_capture(ticket, result),
            _ => CaptureResolution::Stale,
        };
        match resolution {
            CaptureResolution::Captured(image) => {
                info!("[{}] Captured {}", self.label, image.filename());
                state.pending = None;
                state.acquisition = AcquisitionState::ImageSet(image);
                state.notice = None;
                Transition::Applied
            }
            CaptureResolution::Failed(e) => {
                state.pending = None;
                let error = FlowError::from(e.clone());
                state.notice = Some(Notice::capture_failed(e));
                Transition::Failed(error)
            }
            CaptureResolution::Stale => Transition::Discarded,
        }
    }

    pub fn cancel_camera(&self) -> Transition {
        let mut state = self.state.lock();
        match &mut state.acquisition {
            AcquisitionState::CameraActive(session) => {
                session.cancel();
                debug!("[{}] Camera cancelled", self.label);
                state.acquisition = AcquisitionState::NoImage;
                if state.pending == Some(Pending::Capture) {
                    state.pending = None;
                }
                Transition::Cancelled
            }
            _ => Transition::Blocked(BlockReason::NotAvailable),
        }
    }

    /// "Select from Gallery".
    pub async fn pick_from_gallery(&self) -> Transition {
        if let Err(reason) = self.begin(Pending::GalleryPick) {
            return Transition::Blocked(reason);
        }
        let result = pick_image(&self.gate, &self.device).await;
        self.apply_pick(result)
    }

    /// "Clear Photo": back to the acquisition controls.
    pub fn clear_image(&self) -> Transition {
        let mut state = self.state.lock();
        if state.pending == Some(Pending::Submission) {
            return Transition::Blocked(BlockReason::Busy);
        }
        match state.acquisition {
            AcquisitionState::ImageSet(_) => {
                debug!("[{}] Image cleared", self.label);
                state.acquisition = AcquisitionState::NoImage;
                Transition::Applied
            }
            _ => Transition::Blocked(BlockReason::NotAvailable),
        }
    }

    pub fn dismiss_notice(&self) {
        self.state.lock().notice = None;
    }

    /// Close the notice. A success notice also leaves the screen.
    pub fn acknowledge(&self) -> Option<Navigation> {
        let mut state = self.state.lock();
        match state.notice.take() {
            Some(notice) if notice.is_success() => {
                info!("[{}] Returning to entry screen", self.label);
                state.disposed = true;
                Some(Navigation::BackToEntry)
            }
            _ => None,
        }
    }

    /// The screen is gone; late results are dropped from here on.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if !state.disposed {
            debug!("[{}] Disposed", self.label);
            state.disposed = true;
        }
    }

    pub(crate) fn view_with(&self, fields_ready: bool) -> ScreenView {
        let state = self.state.lock();
        let submit_enabled = !state.disposed
            && state.pending.is_none()
            && fields_ready
            && matches!(state.acquisition, AcquisitionState::ImageSet(_));
        ScreenView {
            slot: state.acquisition.slot(),
            pending: state.pending,
            notice: state.notice.clone(),
            submit_enabled,
        }
    }

    pub(crate) fn is_submitting(&self) -> bool {
        self.state.lock().pending == Some(Pending::Submission)
    }

    /// Claim the screen for a submission. `build` sees the active image and returns the
    /// request, or `None` when the form is incomplete.
    pub(crate) fn begin_submission<R>(
        &self,
        build: impl FnOnce(&CapturedImage) -> Option<R>,
    ) -> Result<R, BlockReason> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(BlockReason::Disposed);
        }
        if state.pending.is_some() {
            return Err(BlockReason::Busy);
        }
        let request = match &state.acquisition {
            AcquisitionState::ImageSet(image) => build(image).ok_or(BlockReason::Incomplete)?,
            _ => return Err(BlockReason::Incomplete),
        };
        state.pending = Some(Pending::Submission);
        state.notice = None;
        Ok(request)
    }

    /// Tell the user what is missing after a refused submit.
    pub(crate) fn refuse_incomplete(&self, message: &str) {
        let mut state = self.state.lock();
        if !state.disposed && state.pending.is_none() {
            state.notice = Some(Notice::incomplete(message));
        }
    }

    pub(crate) fn finish_submission(&self, notice: Notice) -> Transition {
        let mut state = self.state.lock();
        if state.disposed {
            warn!("[{}] Ignoring submission outcome for a closed screen", self.label);
            return Transition::Discarded;
        }
        state.pending = None;
        let transition = match &notice.kind {
            NoticeKind::Success => Transition::Applied,
            NoticeKind::Error(e) => Transition::Failed(e.clone()),
        };
        state.notice = Some(notice);
        transition
    }

    /// Start an acquisition action; only from the acquisition controls and only when idle.
    fn begin(&self, pending: Pending) -> Result<(), BlockReason> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(BlockReason::Disposed);
        }
        if state.pending.is_some() {
            return Err(BlockReason::Busy);
        }
        if !matches!(state.acquisition, AcquisitionState::NoImage) {
            return Err(BlockReason::NotAvailable);
        }
        state.pending = Some(pending);
        Ok(())
    }

    fn enter_camera(&self, session: CameraSession) -> Transition {
        let mut state = self.state.lock();
        if state.disposed {
            return Transition::Discarded;
        }
        state.pending = None;
        if session.is_active() {
            debug!("[{}] Camera active", self.label);
            state.acquisition = AcquisitionState::CameraActive(session);
            state.notice = None;
            Transition::Applied
        } else {
            info!("[{}] Camera permission not granted", self.label);
            state.notice = Some(Notice::permission_denied(Capability::Camera));
            Transition::Failed(FlowError::PermissionDenied(Capability::Camera))
        }
    }

    fn apply_pick(&self, result: Result<Acquisition, PickFailure>) -> Transition {
        let mut state = self.state.lock();
        if state.disposed {
            return Transition::Discarded;
        }
        state.pending = None;
        match result {
            Ok(Acquisition::Captured(image)) => {
                info!("[{}] Picked {}", self.label, image.filename());
                state.acquisition = AcquisitionState::ImageSet(image);
                state.notice = None;
                Transition::Applied
            }
            Ok(Acquisition::Cancelled) => {
                debug!("[{}] Gallery pick cancelled", self.label);
                Transition::Cancelled
            }
            Err(PickFailure::NotPermitted(_)) => {
                state.notice = Some(Notice::permission_denied(Capability::Gallery));
                Transition::Failed(FlowError::PermissionDenied(Capability::Gallery))
            }
            Err(PickFailure::Device(e)) => {
                let error = FlowError::from(e.clone());
                state.notice = Some(Notice::capture_failed(e));
                Transition::Failed(error)
            }
        }
    }
}
