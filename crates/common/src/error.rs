use thiserror::Error;

/// Error type for the fallible helpers in this crate.
///
/// The other library crates define richer errors of their own, and the
/// binaries wrap everything in `anyhow`; this stays message-shaped because
/// interpolation failures carry nothing but the offending path.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
