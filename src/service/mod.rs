pub mod client;
pub mod protocol;

pub use client::{SubmissionClient, Submitter};
pub use protocol::{
    Recognized, RecognitionRequest, Registered, RegistrationRequest, SubmissionFailure,
    SubmissionOutcome, UserId,
};
