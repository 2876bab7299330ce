use thiserror::Error;

/// Failure classes for a generation attempt. Every variant carries a stable,
/// user-readable message; raw transport errors never cross the backend
/// boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Pre-flight input checks. Raised by the state controller before
    /// dispatch, never by a backend.
    #[error("{0}")]
    Validation(String),

    /// Missing or rejected API credential. Recoverable by supplying a new
    /// key.
    #[error("The API key is missing or was rejected. Update your key and try again.")]
    Auth,

    /// Rate or quota limit. Recoverable by waiting, not by changing inputs.
    #[error("Rate limit reached. Wait a minute before retrying, or switch to another API key.")]
    Quota,

    /// The upstream safety filters refused the request. Resubmitting the
    /// same inputs will not help.
    #[error("The request was blocked by the safety filters. Adjust the prompt or images and try again.")]
    SafetyBlocked,

    /// The model answered but produced nothing usable. Carries the model's
    /// own explanation when one was returned.
    #[error("{0}")]
    EmptyResponse(String),

    #[error("Could not reach the image service. Check your connection and try again.")]
    Network,
}

impl GenerationError {
    pub fn empty_response(detail: Option<String>) -> GenerationError {
        let message = detail
            .filter(|text| return !text.trim().is_empty())
            .unwrap_or_else(|| {
                return "The model returned no image. Try a more specific prompt.".to_string();
            });

        return GenerationError::EmptyResponse(message);
    }
}
