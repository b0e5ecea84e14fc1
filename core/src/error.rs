use thiserror::Error;

/// Errors surfaced by every library operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConcordError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid division '{0}', expected one of torah, neviim, ketuvim")]
    InvalidDivision(String),

    #[error("invalid phrase '{phrase}': {reason}")]
    InvalidPhrase { phrase: String, reason: String },

    #[error("book '{0}' already exists")]
    DuplicateBook(String),

    #[error("group '{0}' already exists")]
    DuplicateGroup(String),

    #[error("phrase '{0}' already exists")]
    DuplicatePhrase(String),

    #[error("{0} was not found")]
    NotFound(String),

    #[error("parse error at line {line} ('{content}'): {reason}")]
    Parse { line: usize, content: String, reason: String },

    #[error("book '{0}' is already indexed")]
    AlreadyIndexed(String),
}

/// Coarse error taxonomy used by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    NotFound,
    Parse,
    AlreadyIndexed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Parse => "parse",
            ErrorKind::AlreadyIndexed => "already_indexed",
        }
    }
}

impl ConcordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConcordError::Validation(_) | ConcordError::InvalidDivision(_) | ConcordError::InvalidPhrase { .. } => {
                ErrorKind::Validation
            }
            ConcordError::DuplicateBook(_) | ConcordError::DuplicateGroup(_) | ConcordError::DuplicatePhrase(_) => {
                ErrorKind::Duplicate
            }
            ConcordError::NotFound(_) => ErrorKind::NotFound,
            ConcordError::Parse { .. } => ErrorKind::Parse,
            ConcordError::AlreadyIndexed(_) => ErrorKind::AlreadyIndexed,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        ConcordError::NotFound(what.into())
    }
}

pub type Result<T> = std::result::Result<T, ConcordError>;
