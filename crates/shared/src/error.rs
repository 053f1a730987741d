use thiserror::Error;

/// Raw step data could not be turned into a recipe. No partial recipe is
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("recipe has no steps")]
    Empty,
    #[error("recipe data is not a mapping of steps")]
    NotAMapping,
    #[error("invalid step '{key}': {reason}")]
    InvalidStep { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("recipe service unreachable: {0}")]
    Unreachable(String),
    /// Message reported by the service, shown to the user as is.
    #[error("{0}")]
    Service(String),
    #[error("invalid recipe service response: {0}")]
    InvalidBody(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("please enter a recipe name before saving")]
    MissingName,
    #[error("failed to save recipe: {0}")]
    Write(String),
    #[error("failed to read saved recipe: {0}")]
    Read(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("a post needs a title")]
    MissingTitle,
    #[error("a post needs an owner")]
    MissingOwner,
    #[error("community service unreachable: {0}")]
    Unreachable(String),
    #[error("community service rejected the post with status {status}")]
    Rejected { status: u16 },
}
