// src/errors.rs

/// Failure surfaced by a fetch action.
///
/// Stored per query entry (see `QueryState::Failed`), so the error variants
/// must stay cheap to clone; payloads are owned strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("sdk call failed: {0}")]
    Sdk(String),
    #[error("prices api error: {detail}")]
    Api { detail: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("user rejected action")]
    UserRejected,
}
