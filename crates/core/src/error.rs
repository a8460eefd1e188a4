use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller can fix the request.
    Input,
    /// An embedding, generation or index backend failed.
    Upstream,
    Internal,
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0}")]
    EmptyInput(String),

    #[error("You can upload a maximum of {limit} PDFs at once (got {count}).")]
    TooManyFiles { count: usize, limit: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid response from {backend}: {details}")]
    Upstream { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl AssistantError {
    pub fn upstream(backend: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Upstream {
            backend: backend.into(),
            details: details.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput(_)
            | Self::TooManyFiles { .. }
            | Self::InvalidArgument(_)
            | Self::InvalidConfig(_)
            | Self::PdfParse(_) => ErrorKind::Input,
            Self::Upstream { .. } | Self::Http(_) | Self::Url(_) | Self::Serialization(_) => {
                ErrorKind::Upstream
            }
            Self::Io(_) | Self::RegexError(_) => ErrorKind::Internal,
        }
    }

    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

pub type Result<T, E = AssistantError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{AssistantError, ErrorKind};

    #[test]
    fn caller_errors_are_classified_as_input() {
        let error = AssistantError::TooManyFiles { count: 6, limit: 5 };
        assert!(error.is_input_error());
        assert_eq!(
            error.to_string(),
            "You can upload a maximum of 5 PDFs at once (got 6)."
        );
    }

    #[test]
    fn backend_failures_are_upstream() {
        let error = AssistantError::upstream("ollama", "500 Internal Server Error");
        assert_eq!(error.kind(), ErrorKind::Upstream);
        assert!(!error.is_input_error());
    }
}
