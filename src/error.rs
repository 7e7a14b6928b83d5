use thiserror::Error;

/// Errors raised by the translation overlay and its store.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// A write referenced a field the owner does not declare as translatable.
    #[error("attribute `{field}` is not translatable on `{owner_type}`")]
    NotTranslatableField {
        owner_type: &'static str,
        field: String,
    },
    /// Locale codes are two ASCII letters.
    #[error("invalid locale code `{0}`")]
    InvalidLocale(String),
    #[error("failed to serialize entity attributes: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("migration file error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    pub fn is_not_translatable(&self) -> bool {
        matches!(self, TranslateError::NotTranslatableField { .. })
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;
