use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use crate::capture::CaptureDevice;
use crate::flow::{BlockReason, Notice, Screen, ScreenView, Transition};
use crate::service::{RecognitionRequest, Recognized, SubmissionOutcome, Submitter};

pub const LOGIN_FAILED_TITLE: &str = "Login Failed";
const LOGIN_FALLBACK: &str = "We could not recognize your face. Please try again.";
const LOGIN_INCOMPLETE: &str = "Please select or take a photo to log in.";

/// Login screen: one photo, sent for recognition.
pub struct LoginFlow<D, S> {
    screen: Screen<D>,
    submitter: S,
    last_outcome: Mutex<Option<SubmissionOutcome<Recognized>>>,
}

impl<D: CaptureDevice, S: Submitter> LoginFlow<D, S> {
    pub fn new(device: Arc<D>, submitter: S) -> Self {
        Self {
            screen: Screen::new("login", device),
            submitter,
            last_outcome: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> &Screen<D> {
        &self.screen
    }

    pub fn can_submit(&self) -> bool {
        self.view().submit_enabled
    }

    pub fn view(&self) -> ScreenView {
        self.screen.view_with(true)
    }

    pub fn last_outcome(&self) -> Option<SubmissionOutcome<Recognized>> {
        self.last_outcome.lock().clone()
    }

    pub async fn submit(&self) -> Transition {
        let request = match self
            .screen
            .begin_submission(|image| Some(RecognitionRequest::new(image.clone())))
        {
            Ok(request) => request,
            Err(reason) => {
                debug!("Login submit refused: {:?}", reason);
                if reason == BlockReason::Incomplete {
                    self.screen.refuse_incomplete(LOGIN_INCOMPLETE);
                }
                return Transition::Blocked(reason);
            }
        };

        info!("Submitting {} for recognition", request.image().filename());
        let outcome = self.submitter.submit_recognition(&request).await;

        let notice = match &outcome {
            SubmissionOutcome::Success(recognized) => {
                Notice::success(format!("Welcome back, {}!", recognized.user_name))
            }
            SubmissionOutcome::Failure(failure) => {
                Notice::submission_failed(LOGIN_FAILED_TITLE, failure, LOGIN_FALLBACK)
            }
        };
        let transition = self.screen.finish_submission(notice);
        if transition != Transition::Discarded {
            *self.last_outcome.lock() = Some(outcome);
        }
        transition
    }
}
