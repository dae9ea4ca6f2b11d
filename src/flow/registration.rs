use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use crate::capture::CaptureDevice;
use crate::flow::{BlockReason, Notice, Screen, ScreenView, Transition};
use crate::service::{Registered, RegistrationRequest, SubmissionOutcome, Submitter};

pub const REGISTRATION_FAILED_TITLE: &str = "Registration Failed";
const REGISTRATION_FALLBACK: &str = "An error occurred.";
const REGISTRATION_INCOMPLETE: &str = "Please fill in all fields and take a photo.";

#[derive(Debug, Default, Clone)]
struct Form {
    name: String,
    email: String,
}

impl Form {
    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Registration screen: name, email and one photo.
pub struct RegistrationFlow<D, S> {
    screen: Screen<D>,
    submitter: S,
    form: Mutex<Form>,
    last_outcome: Mutex<Option<SubmissionOutcome<Registered>>>,
}

impl<D: CaptureDevice, S: Submitter> RegistrationFlow<D, S> {
    pub fn new(device: Arc<D>, submitter: S) -> Self {
        Self {
            screen: Screen::new("registration", device),
            submitter,
            form: Mutex::new(Form::default()),
            last_outcome: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> &Screen<D> {
        &self.screen
    }

    pub fn name(&self) -> String {
        self.form.lock().name.clone()
    }

    pub fn email(&self) -> String {
        self.form.lock().email.clone()
    }

    pub fn set_name(&self, name: &str) -> Transition {
        self.edit(|form| form.name = name.to_string())
    }

    pub fn set_email(&self, email: &str) -> Transition {
        self.edit(|form| form.email = email.to_string())
    }

    fn edit(&self, apply: impl FnOnce(&mut Form)) -> Transition {
        if self.screen.is_disposed() {
            return Transition::Blocked(BlockReason::Disposed);
        }
        if self.screen.is_submitting() {
            return Transition::Blocked(BlockReason::Busy);
        }
        apply(&mut self.form.lock());
        Transition::Applied
    }

    pub fn can_submit(&self) -> bool {
        self.view().submit_enabled
    }

    pub fn view(&self) -> ScreenView {
        let complete = self.form.lock().is_complete();
        self.screen.view_with(complete)
    }

    pub fn last_outcome(&self) -> Option<SubmissionOutcome<Registered>> {
        self.last_outcome.lock().clone()
    }

    pub async fn submit(&self) -> Transition {
        let request = match self.screen.begin_submission(|image| {
            let form = self.form.lock();
            RegistrationRequest::new(&form.name, &form.email, image.clone())
        }) {
            Ok(request) => request,
            Err(reason) => {
                debug!("Registration submit refused: {:?}", reason);
                if reason == BlockReason::Incomplete {
                    self.screen.refuse_incomplete(REGISTRATION_INCOMPLETE);
                }
                return Transition::Blocked(reason);
            }
        };

        info!("Registering {} <{}>", request.name(), request.email());
        let outcome = self.submitter.submit_registration(&request).await;

        let notice = match &outcome {
            SubmissionOutcome::Success(registered) => {
                Notice::success(format!("User {} registered.", registered.user_id))
            }
            SubmissionOutcome::Failure(failure) => {
                Notice::submission_failed(REGISTRATION_FAILED_TITLE, failure, REGISTRATION_FALLBACK)
            }
        };
        let transition = self.screen.finish_submission(notice);
        if transition != Transition::Discarded {
            *self.last_outcome.lock() = Some(outcome);
        }
        transition
    }
}
