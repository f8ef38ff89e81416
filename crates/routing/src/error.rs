#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("routes[{index}] pattern {pattern:?}: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
