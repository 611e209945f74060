use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

/// Body posted to the download endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub pdf: String,
}

impl DownloadRequest {
    pub fn from_fields(
        name: &str,
        email: &str,
        mobile: &str,
        pdf: Option<&str>,
    ) -> Result<Self, SubmitError> {
        let request = Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            mobile: mobile.trim().to_string(),
            pdf: pdf.unwrap_or_default().trim().to_string(),
        };

        if request.name.is_empty() || request.email.is_empty() || request.mobile.is_empty() {
            return Err(SubmitError::MissingFields);
        }
        Ok(request)
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("{}", config::MSG_MISSING_FIELDS)]
    MissingFields,

    #[error("Error: {message}")]
    Server { message: String },

    #[error("{}", config::MSG_TRANSPORT)]
    Transport,
}

impl SubmitError {
    /// Builds the error for a non-2xx response. `body` is whatever the server
    /// sent back, which may or may not be `{"message": ...}`.
    pub fn server(status: u16, status_text: &str, body: &str) -> Self {
        let from_body = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|resp| resp.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let message = from_body.unwrap_or_else(|| {
            if status_text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                status_text.trim().to_string()
            }
        });

        SubmitError::Server { message }
    }
}

/// What the status line under the form currently says.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Processing,
    Success,
    Failed(SubmitError),
}

impl Status {
    pub fn text(&self) -> String {
        match self {
            Status::Processing => config::MSG_PROCESSING.to_string(),
            Status::Success => config::MSG_SUCCESS.to_string(),
            Status::Failed(err) => err.to_string(),
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Status::Processing => "processing",
            Status::Success => "success",
            Status::Failed(_) => "error",
        }
    }
}
