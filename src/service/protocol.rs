use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use crate::capture::CapturedImage;

pub const REGISTER_PATH: &str = "register";
pub const RECOGNIZE_PATH: &str = "recognize";

// Multipart field names
pub const NAME_FIELD: &str = "name";
pub const EMAIL_FIELD: &str = "email";
pub const IMAGE_FIELD: &str = "image_file";

/// Declared content type for every uploaded photo, whatever its source.
pub const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";

// Request types

/// Enrollment request; only exists when name, email and image are all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    name: String,
    email: String,
    image: CapturedImage,
}

impl RegistrationRequest {
    pub fn new(name: &str, email: &str, image: CapturedImage) -> Option<Self> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            email: email.to_string(),
            image,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn image(&self) -> &CapturedImage {
        &self.image
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    image: CapturedImage,
}

impl RecognitionRequest {
    pub fn new(image: CapturedImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &CapturedImage {
        &self.image
    }
}

// Response types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(id) => write!(f, "{}", id),
            UserId::Text(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    pub user_id: UserId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognized {
    #[serde(deserialize_with = "non_blank")]
    pub user_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn non_blank<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let text = String::deserialize(deserializer)?;
    if text.trim().is_empty() {
        return Err(D::Error::custom("user_name is empty"));
    }
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// No usable response: connect, DNS, timeout, or the photo could not be read.
    Transport(String),
    /// The service answered and refused the request.
    Rejected {
        status: Option<u16>,
        detail: Option<String>,
    },
}

impl SubmissionFailure {
    pub fn detail(&self) -> Option<&str> {
        match self {
            SubmissionFailure::Transport(detail) => Some(detail),
            SubmissionFailure::Rejected { detail, .. } => detail.as_deref(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SubmissionFailure::Transport(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome<T> {
    Success(T),
    Failure(SubmissionFailure),
}

impl<T> SubmissionOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            SubmissionOutcome::Success(payload) => Some(payload),
            SubmissionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&SubmissionFailure> {
        match self {
            SubmissionOutcome::Success(_) => None,
            SubmissionOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Diagnostic text from an error body: `error`, `detail` or `message` of a JSON object,
/// otherwise the plain-text body itself.
pub fn rejection_detail(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => detail_from_json(&value),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

fn detail_from_json(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;
    ["error", "detail", "message"].iter().find_map(|key| match object.get(*key)? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        serde_json::Value::Null | serde_json::Value::String(_) => None,
        other => Some(other.to_string()),
    })
}

/// `error` or `detail` set on a 2xx body. `message` alone is informational.
fn rejection_in_success(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;
    ["error", "detail"].iter().find_map(|key| match object.get(*key)? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(text) if text.trim().is_empty() => None,
        serde_json::Value::String(text) => Some(text.trim().to_string()),
        other => Some(other.to_string()),
    })
}

/// Interpret a 2xx body. A payload missing the expected fields, or carrying an `error` or
/// `detail`, counts as a rejection.
pub fn parse_success<T: DeserializeOwned>(status: u16, body: &[u8]) -> SubmissionOutcome<T> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            return SubmissionOutcome::Failure(SubmissionFailure::Rejected {
                status: Some(status),
                detail: rejection_detail(body)
                    .or_else(|| Some("Service returned an empty response".to_string())),
            })
        }
    };

    if let Some(detail) = rejection_in_success(&value) {
        return SubmissionOutcome::Failure(SubmissionFailure::Rejected {
            status: Some(status),
            detail: Some(detail),
        });
    }

    match serde_json::from_value::<T>(value.clone()) {
        Ok(payload) => SubmissionOutcome::Success(payload),
        Err(e) => SubmissionOutcome::Failure(SubmissionFailure::Rejected {
            status: Some(status),
            detail: detail_from_json(&value)
                .or_else(|| Some(format!("Unexpected response from service: {}", e))),
        }),
    }
}
