/// Errors raised before a search runs. An empty result list is not an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid series '{name}': {reason}")]
    InvalidSeries { name: String, reason: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
