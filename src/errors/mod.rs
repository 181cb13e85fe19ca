use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid source descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Unknown rendering backend: {0}")]
    UnknownBackend(String),

    // Acquisition errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Pagination errors
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Unsupported ordering field: {0}")]
    UnsupportedOrderField(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type HarvestResult<T> = Result<T, HarvestError>;
