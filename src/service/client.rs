use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::capture::CapturedImage;
use crate::common::config::ServiceConfig;
use crate::common::{FaceIdError, Result};
use crate::service::protocol::{
    self, Recognized, RecognitionRequest, Registered, RegistrationRequest, SubmissionFailure,
    SubmissionOutcome, EMAIL_FIELD, IMAGE_FIELD, NAME_FIELD, RECOGNIZE_PATH, REGISTER_PATH,
    UPLOAD_CONTENT_TYPE,
};

/// Sends enrollment and recognition requests. One call is one network exchange.
#[allow(async_fn_in_trait)]
pub trait Submitter {
    async fn submit_registration(&self, request: &RegistrationRequest) -> SubmissionOutcome<Registered>;
    async fn submit_recognition(&self, request: &RecognitionRequest) -> SubmissionOutcome<Recognized>;
}

impl<T: Submitter> Submitter for Arc<T> {
    async fn submit_registration(&self, request: &RegistrationRequest) -> SubmissionOutcome<Registered> {
        (**self).submit_registration(request).await
    }

    async fn submit_recognition(&self, request: &RecognitionRequest) -> SubmissionOutcome<Recognized> {
        (**self).submit_recognition(request).await
    }
}

/// HTTP client for the recognition service.
#[derive(Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    register_url: Url,
    recognize_url: Url,
}

impl SubmissionClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Self::with_client(&config.base_url, http)
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| FaceIdError::Config(format!("Invalid service URL {}: {}", base_url, e)))?;
        // Keep any path prefix when joining endpoints.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| FaceIdError::Config(format!("Invalid endpoint {}: {}", path, e)))
        };

        Ok(Self {
            register_url: join(REGISTER_PATH)?,
            recognize_url: join(RECOGNIZE_PATH)?,
            http,
        })
    }

    pub fn register_url(&self) -> &Url {
        &self.register_url
    }

    pub fn recognize_url(&self) -> &Url {
        &self.recognize_url
    }

    async fn image_part(image: &CapturedImage) -> std::result::Result<Part, SubmissionFailure> {
        let path = image.local_path();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            SubmissionFailure::Transport(format!("Could not read photo {}: {}", path.display(), e))
        })?;
        debug!("Attaching {} ({} bytes)", image.filename(), bytes.len());
        Part::bytes(bytes)
            .file_name(image.filename().to_string())
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(|e| SubmissionFailure::Transport(e.to_string()))
    }

    async fn post<T: DeserializeOwned>(&self, url: &Url, form: Form) -> SubmissionOutcome<T> {
        info!("POST {}", url);
        let response = match self.http.post(url.clone()).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    warn!("Request to {} timed out", url);
                } else {
                    warn!("Request to {} failed: {}", url, e);
                }
                return SubmissionOutcome::Failure(SubmissionFailure::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                warn!("HTTP {} from {} with unreadable body: {}", status, url, e);
                return SubmissionOutcome::Failure(SubmissionFailure::Rejected {
                    status: Some(status.as_u16()),
                    detail: None,
                });
            }
            Err(e) => {
                warn!("Reading response from {} failed: {}", url, e);
                return SubmissionOutcome::Failure(SubmissionFailure::Transport(e.to_string()));
            }
        };

        if !status.is_success() {
            let detail = protocol::rejection_detail(&body);
            warn!("Service rejected request with HTTP {}: {:?}", status, detail);
            return SubmissionOutcome::Failure(SubmissionFailure::Rejected {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let outcome = protocol::parse_success(status.as_u16(), &body);
        if let SubmissionOutcome::Failure(failure) = &outcome {
            warn!("Service returned an unusable payload: {:?}", failure.detail());
        }
        outcome
    }
}

impl Submitter for SubmissionClient {
    async fn submit_registration(&self, request: &RegistrationRequest) -> SubmissionOutcome<Registered> {
        let part = match Self::image_part(request.image()).await {
            Ok(part) => part,
            Err(failure) => return SubmissionOutcome::Failure(failure),
        };
        let form = Form::new()
            .text(NAME_FIELD, request.name().to_string())
            .text(EMAIL_FIELD, request.email().to_string())
            .part(IMAGE_FIELD, part);
        self.post(&self.register_url, form).await
    }

    async fn submit_recognition(&self, request: &RecognitionRequest) -> SubmissionOutcome<Recognized> {
        let part = match Self::image_part(request.image()).await {
            Ok(part) => part,
            Err(failure) => return SubmissionOutcome::Failure(failure),
        };
        let form = Form::new().part(IMAGE_FIELD, part);
        self.post(&self.recognize_url, form).await
    }
}
