use slugway_core::{CoreError, LanguageId, PageId, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CascadeError>;

#[derive(Debug, Clone, Error)]
pub enum CascadeError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid data: {0}")]
    Invalid(#[from] CoreError),
    #[error("page {0} does not belong to any configured site")]
    SiteNotFound(PageId),
    #[error("site '{site}' has no language {language_id}")]
    LanguageNotFound { site: String, language_id: LanguageId },
    #[error("page tree loops back to page {page_id}")]
    CyclicPageTree { page_id: PageId },
    #[error("page tree below page {page_id} is deeper than {max_depth} levels")]
    TreeTooDeep { page_id: PageId, max_depth: usize },
    #[error("redirect lifetime of {days} days overflows the timestamp range")]
    RedirectTtlOverflow { days: u32 },
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Errors raised while loading site configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read site configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed site configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid site configuration: {0}")]
    Invalid(String),
}
