use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("{0} is not supported by the search backend")]
    UnsupportedFieldType(String),

    #[error("Store creation failed. Store: {0}")]
    StoreCreationFailed(String),

    #[error("Backend call {operation} on {store} failed: {message}")]
    BackendCallFailed {
        operation: String,
        store: String,
        message: String,
    },

    #[error("Query translation failed: {0}")]
    QueryTranslationFailed(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend returned {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => IndexError::BackendStatus {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => IndexError::Http(e.to_string()),
        }
    }
}

impl IndexError {
    /// Structural failures abort the enclosing operation; everything else is
    /// logged and skipped by best-effort phases.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexError::MissingConfiguration(_)
                | IndexError::UnsupportedFieldType(_)
                | IndexError::StoreCreationFailed(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::BackendStatus { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(IndexError::StoreCreationFailed("x".into()).is_fatal());
        assert!(IndexError::UnsupportedFieldType("BLOB".into()).is_fatal());
        assert!(!IndexError::Http("refused".into()).is_fatal());
        assert!(!IndexError::QueryTranslationFailed("bad".into()).is_fatal());
    }

    #[test]
    fn test_unsupported_type_names_the_type() {
        let err = IndexError::UnsupportedFieldType("LONGBLOB".into());
        assert_eq!(
            err.to_string(),
            "LONGBLOB is not supported by the search backend"
        );
    }
}
