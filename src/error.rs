//! Error type shared by the session store, collaborators and audio pipeline.

/// Errors raised inside the client. None of them are fatal: callers recover
/// into a visible assistant message, an `Error` status, or a quiet no-op.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("prompt cannot be empty")]
    EmptyPrompt,
    #[error("a request is already in flight")]
    Busy,
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("message {index} not found in session {session_id}")]
    MessageNotFound { session_id: String, index: usize },
    #[error("no Gemini API key configured")]
    MissingApiKey,
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("PCM decode error: {0}")]
    Decode(String),
    #[error("audio device error: {0}")]
    Audio(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(ChatError::EmptyPrompt.to_string(), "prompt cannot be empty");
        assert_eq!(
            ChatError::SessionNotFound("42".into()).to_string(),
            "session not found: 42"
        );
        assert_eq!(
            ChatError::MessageNotFound {
                session_id: "7".into(),
                index: 3
            }
            .to_string(),
            "message 3 not found in session 7"
        );
        assert_eq!(
            ChatError::Decode("odd length".into()).to_string(),
            "PCM decode error: odd length"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<Vec<u8>>("{not json").unwrap_err();
        let chat_err: ChatError = err.into();
        assert!(matches!(chat_err, ChatError::Json(_)));
    }

    #[test]
    fn test_api_error_includes_status() {
        let err = ChatError::Api {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream".into(),
        };
        assert!(err.to_string().starts_with("API error 502"));
    }
}
