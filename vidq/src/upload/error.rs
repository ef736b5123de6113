//! Transport error types and their outcome classification.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::UploadOutcome;

/// API error reasons meaning the daily allowance is used up.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "uploadLimitExceeded",
    "rateLimitExceeded",
    "dailyLimitExceeded",
    "userRateLimitExceeded",
];

/// Errors raised while transferring a video.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to read video file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api {
        status: StatusCode,
        reasons: Vec<String>,
        message: String,
    },

    #[error("Upload session response had no Location header")]
    MissingSessionUri,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: String,
}

impl TransportError {
    /// Build an API error from a failed response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status,
                reasons: parsed
                    .error
                    .errors
                    .into_iter()
                    .map(|e| e.reason)
                    .filter(|r| !r.is_empty())
                    .collect(),
                message: parsed.error.message,
            },
            Err(_) => Self::Api {
                status,
                reasons: Vec::new(),
                message: body.chars().take(200).collect(),
            },
        }
    }

    /// Whether the failure means the daily quota is exhausted.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            Self::Api {
                status, reasons, ..
            } => {
                matches!(*status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
                    && reasons.iter().any(|r| QUOTA_REASONS.contains(&r.as_str()))
            }
            _ => false,
        }
    }

    /// Classify into the scheduler's outcome.
    pub fn into_outcome(self) -> UploadOutcome {
        if self.is_quota_exhausted() {
            UploadOutcome::FailedQuota
        } else {
            UploadOutcome::FailedOther(self.to_string())
        }
    }
}
