#![allow(dead_code)]

use faceid::capture::{
    Acquisition, CameraDevice, Capability, CaptureError, CapturedImage, GalleryPicker,
    PermissionPrompt, PermissionState,
};
use faceid::service::{
    Recognized, RecognitionRequest, Registered, RegistrationRequest, SubmissionOutcome,
    Submitter, UserId,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Scriptable phone: permission status and prompt answers per capability, queued camera
/// shots and gallery picks, optional hold on the shutter.
pub struct FakeDevice {
    camera_status: Mutex<PermissionState>,
    gallery_status: Mutex<PermissionState>,
    camera_answer: Mutex<PermissionState>,
    gallery_answer: Mutex<PermissionState>,
    prompts: AtomicUsize,
    captures: AtomicUsize,
    shots: Mutex<VecDeque<Result<CapturedImage, CaptureError>>>,
    picks: Mutex<VecDeque<Result<Acquisition, CaptureError>>>,
    shutter_hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeDevice {
    /// Nothing decided yet; every prompt is answered with a grant.
    pub fn new() -> Self {
        Self {
            camera_status: Mutex::new(PermissionState::Undetermined),
            gallery_status: Mutex::new(PermissionState::Undetermined),
            camera_answer: Mutex::new(PermissionState::Granted),
            gallery_answer: Mutex::new(PermissionState::Granted),
            prompts: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
            shots: Mutex::new(VecDeque::new()),
            picks: Mutex::new(VecDeque::new()),
            shutter_hold: Mutex::new(None),
        }
    }

    pub fn set_status(&self, capability: Capability, state: PermissionState) {
        match capability {
            Capability::Camera => *self.camera_status.lock() = state,
            Capability::Gallery => *self.gallery_status.lock() = state,
        }
    }

    pub fn set_answer(&self, capability: Capability, state: PermissionState) {
        match capability {
            Capability::Camera => *self.camera_answer.lock() = state,
            Capability::Gallery => *self.gallery_answer.lock() = state,
        }
    }

    pub fn queue_shot(&self, shot: Result<CapturedImage, CaptureError>) {
        self.shots.lock().push_back(shot);
    }

    pub fn queue_pick(&self, pick: Result<Acquisition, CaptureError>) {
        self.picks.lock().push_back(pick);
    }

    /// Captures wait on the returned handle before resolving.
    pub fn hold_shutter(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.shutter_hold.lock() = Some(Arc::clone(&notify));
        notify
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl PermissionPrompt for FakeDevice {
    async fn status(&self, capability: Capability) -> PermissionState {
        match capability {
            Capability::Camera => *self.camera_status.lock(),
            Capability::Gallery => *self.gallery_status.lock(),
        }
    }

    async fn request(&self, capability: Capability) -> PermissionState {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let answer = match capability {
            Capability::Camera => *self.camera_answer.lock(),
            Capability::Gallery => *self.gallery_answer.lock(),
        };
        self.set_status(capability, answer);
        answer
    }
}

impl CameraDevice for FakeDevice {
    async fn capture(&self) -> Result<CapturedImage, CaptureError> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        let hold = self.shutter_hold.lock().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        let queued = self.shots.lock().pop_front();
        queued.unwrap_or_else(|| Ok(CapturedImage::from_uri(format!("file:///camera/shot_{}.jpg", n))))
    }
}

impl GalleryPicker for FakeDevice {
    async fn pick(&self) -> Result<Acquisition, CaptureError> {
        let queued = self.picks.lock().pop_front();
        queued.unwrap_or_else(|| {
            Ok(Acquisition::Captured(CapturedImage::from_uri("file:///gallery/face.jpg")))
        })
    }
}

/// Records every call and answers with canned outcomes.
pub struct FakeSubmitter {
    calls: AtomicUsize,
    registration: Mutex<SubmissionOutcome<Registered>>,
    recognition: Mutex<SubmissionOutcome<Recognized>>,
    hold: Mutex<Option<Arc<Notify>>>,
    pub registrations: Mutex<Vec<RegistrationRequest>>,
    pub recognitions: Mutex<Vec<RecognitionRequest>>,
}

impl FakeSubmitter {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            registration: Mutex::new(SubmissionOutcome::Success(Registered {
                user_id: UserId::Number(1),
                message: None,
            })),
            recognition: Mutex::new(SubmissionOutcome::Success(recognized("Ada"))),
            hold: Mutex::new(None),
            registrations: Mutex::new(Vec::new()),
            recognitions: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_registration(&self, outcome: SubmissionOutcome<Registered>) {
        *self.registration.lock() = outcome;
    }

    pub fn answer_recognition(&self, outcome: SubmissionOutcome<Recognized>) {
        *self.recognition.lock() = outcome;
    }

    /// Submissions wait on the returned handle before answering.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock() = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }
    }
}

impl Submitter for FakeSubmitter {
    async fn submit_registration(&self, request: &RegistrationRequest) -> SubmissionOutcome<Registered> {
        self.registrations.lock().push(request.clone());
        self.wait().await;
        self.registration.lock().clone()
    }

    async fn submit_recognition(&self, request: &RecognitionRequest) -> SubmissionOutcome<Recognized> {
        self.recognitions.lock().push(request.clone());
        self.wait().await;
        self.recognition.lock().clone()
    }
}

pub fn recognized(name: &str) -> Recognized {
    Recognized {
        user_name: name.to_string(),
        user_email: None,
        message: None,
    }
}

/// Yield until `ready` holds, so a second action starts only once the first is suspended.
pub async fn until(ready: impl Fn() -> bool) {
    while !ready() {
        tokio::task::yield_now().await;
    }
}
