use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A translation failure tied to its originating source line. The line
/// number is 1-based and counts raw input lines, comments included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("{unit}:{line}: {message} in `{text}`")]
    Parse {
        unit: String,
        line: usize,
        text: String,
        message: String,
    },

    #[error("{unit}:{line}: {message} in `{text}`")]
    Resolution {
        unit: String,
        line: usize,
        text: String,
        message: String,
    },

    #[error("{unit}:{line}: {message} in `{text}`")]
    Semantic {
        unit: String,
        line: usize,
        text: String,
        message: String,
    },

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl TranslateError {
    /// The source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            TranslateError::Parse { line, .. }
            | TranslateError::Resolution { line, .. }
            | TranslateError::Semantic { line, .. } => Some(*line),
            TranslateError::Internal { .. } => None,
        }
    }

    /// The translation unit the error belongs to, when it has one.
    pub fn unit(&self) -> Option<&str> {
        match self {
            TranslateError::Parse { unit, .. }
            | TranslateError::Resolution { unit, .. }
            | TranslateError::Semantic { unit, .. } => Some(unit),
            TranslateError::Internal { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TranslateError::Parse { message, .. }
            | TranslateError::Resolution { message, .. }
            | TranslateError::Semantic { message, .. }
            | TranslateError::Internal { message } => message,
        }
    }
}

/// Every error collected over one translation. A failed translation
/// returns the full list and no assembly output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorList {
    errors: Vec<TranslateError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: TranslateError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = TranslateError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslateError> {
        self.errors.iter()
    }
}

impl From<Vec<TranslateError>> for ErrorList {
    fn from(errors: Vec<TranslateError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for ErrorList {
    type Item = TranslateError;
    type IntoIter = std::vec::IntoIter<TranslateError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl Display for ErrorList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}
