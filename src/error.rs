use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures of a backend call. None of these end the session; the UI loop
/// turns each one into a scoped notice, panel or viewer message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was obtained.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered but marked the call as failed.
    #[error("{message}")]
    Application { status: u16, message: String },

    /// The payload could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn application(status: u16, message: Option<String>, fallback: &str) -> Self {
        let message = message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Self::Application { status, message }
    }

    /// Text shown to the operator. Application errors keep the server's
    /// wording untouched.
    pub fn user_message(&self) -> String {
        match self {
            Self::Application { message, .. } => message.clone(),
            other => compact_error(other),
        }
    }
}

fn compact_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source
        && out.len() <= 2
    {
        out.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    out.join("; ")
}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn application_error_prefers_server_detail() {
        let error = ApiError::application(409, Some("pod is terminating".to_string()), "Failed");
        assert_eq!(error.user_message(), "pod is terminating");
        assert_eq!(error.to_string(), "pod is terminating");
    }

    #[test]
    fn application_error_falls_back_when_detail_missing() {
        let error = ApiError::application(500, Some("  ".to_string()), "Scale down failed");
        assert_eq!(error.user_message(), "Scale down failed");
        let error = ApiError::application(500, None, "Failed to delete resource");
        assert!(matches!(error, ApiError::Application { status: 500, .. }));
    }
}
