use crate::{diagram::DiagramError, storage::StoreError};

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    Diagram(DiagramError),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Internal(message) => message.as_str(),
            Self::Diagram(err) => err.category(),
        }
    }

    /// Diagnostic text kept apart from the category message.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Diagram(DiagramError::UnsupportedEngine { engine, supported }) => Some(format!(
                "'{engine}' is not one of: {}",
                supported.join(", ")
            )),
            Self::Diagram(
                DiagramError::DumpFailed { details, .. }
                | DiagramError::ImportFailed { details }
                | DiagramError::RenderFailed { details },
            ) => Some(details.clone()),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Diagram(DiagramError::DumpFailed { hint, .. }) => Some(hint.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.details() {
            Some(details) => write!(f, "{}: {}", self.message(), details),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl From<DiagramError> for AppError {
    fn from(err: DiagramError) -> Self {
        AppError::Diagram(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName { .. } => AppError::bad_request(err.to_string()),
            StoreError::NotFound(_) => AppError::not_found(err.to_string()),
            StoreError::AlreadyExists(_) => AppError::conflict(err.to_string()),
            StoreError::Malformed { .. } | StoreError::Io { .. } => {
                AppError::internal(err.to_string())
            }
        }
    }
}
