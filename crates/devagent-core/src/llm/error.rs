//! LLM error types

use std::fmt;

/// Error type for capability provider calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The backend could not be reached (server down, DNS, refused connection)
    Unavailable(String),

    /// Network error after the connection was established
    Connection(String),

    /// API error (authentication, bad request, server error)
    Api { status: u16, message: String },

    /// Model not found on the backend
    ModelNotFound(String),

    /// The call exceeded its wall-clock bound
    Timeout { seconds: u64 },

    /// The backend answered, but not in the expected shape
    MalformedResponse(String),

    /// Rate limited
    RateLimited { retry_after: Option<u64> },
}

impl LlmError {
    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        LlmError::MalformedResponse(msg.into())
    }

    /// Suggested next step for the user, shown alongside the error
    pub fn remedy(&self) -> &'static str {
        match self {
            LlmError::Unavailable(_) | LlmError::Connection(_) => {
                "Check that the LLM backend is running and reachable (e.g. `ollama serve`)."
            }
            LlmError::Api { status, .. } if *status == 401 || *status == 403 => {
                "Check the API key configured for the provider."
            }
            LlmError::Api { .. } => "Check the provider configuration and try again.",
            LlmError::ModelNotFound(_) => {
                "Pull or select an installed model (see `llm.providers.<id>.default_model`)."
            }
            LlmError::Timeout { .. } => {
                "The backend is slow to answer; raise `llm.timeout` or use a smaller model."
            }
            LlmError::MalformedResponse(_) => {
                "The model returned an unexpected format; try again or switch models."
            }
            LlmError::RateLimited { .. } => "Wait a moment before retrying.",
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            LlmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LlmError::Api { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            LlmError::ModelNotFound(model) => write!(f, "Model not found: {}", model),
            LlmError::Timeout { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            LlmError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            LlmError::RateLimited { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limited, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limited")
                }
            }
        }
    }
}

impl std::error::Error for LlmError {}

impl From<ureq::Error> for LlmError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let retry_after = response
                    .header("retry-after")
                    .and_then(|v| v.parse::<u64>().ok());
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                match status {
                    429 => LlmError::RateLimited { retry_after },
                    401 | 403 => LlmError::Api {
                        status,
                        message: "Authentication failed".to_string(),
                    },
                    404 if message.contains("model") => LlmError::ModelNotFound(message),
                    _ => LlmError::Api { status, message },
                }
            }
            ureq::Error::Transport(transport) => match transport.kind() {
                ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                    LlmError::Unavailable(transport.to_string())
                }
                _ => LlmError::Connection(transport.to_string()),
            },
        }
    }
}

impl LlmError {
    /// Convert a ureq error, reporting socket timeouts as [`LlmError::Timeout`]
    pub(crate) fn from_ureq(err: ureq::Error, timeout_secs: u64) -> Self {
        if let ureq::Error::Transport(transport) = &err {
            if transport.kind() == ureq::ErrorKind::Io
                && transport.to_string().contains("timed out")
            {
                return LlmError::Timeout {
                    seconds: timeout_secs,
                };
            }
        }
        err.into()
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::MalformedResponse(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        assert_eq!(
            LlmError::Unavailable("ollama".to_string()).to_string(),
            "Provider unavailable: ollama"
        );
        assert_eq!(
            LlmError::Timeout { seconds: 10 }.to_string(),
            "Request timed out after 10 seconds"
        );
        assert_eq!(
            LlmError::RateLimited {
                retry_after: Some(5)
            }
            .to_string(),
            "Rate limited, retry after 5 seconds"
        );
    }

    #[test]
    fn test_remedy_mentions_backend() {
        let err = LlmError::Unavailable("connection refused".to_string());
        assert!(err.remedy().contains("LLM backend"));

        let auth = LlmError::Api {
            status: 401,
            message: "nope".to_string(),
        };
        assert!(auth.remedy().contains("API key"));
    }

    #[test]
    fn test_json_error_is_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: LlmError = json_err.into();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
