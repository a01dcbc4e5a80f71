/// Every failure the launcher helper can report to a caller.
///
/// `InvalidInput`, `NotFound` and `Unavailable` are the labelled failures
/// surfaced on the channel; the wrapped variants carry the underlying
/// decoder or filesystem error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No application found for package {package}")]
    NotFound { package: String },

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Svg(#[from] usvg::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod codes {
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const UNAVAILABLE: &str = "UNAVAILABLE";
    pub const IO_ERROR: &str = "IO_ERROR";
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn not_found(package: impl Into<String>) -> Self {
        Error::NotFound {
            package: package.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::Unavailable(msg.into())
    }

    /// Machine-readable code sent alongside the message on the channel.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) | Error::Image(_) | Error::Svg(_) => codes::INVALID_INPUT,
            Error::NotFound { .. } => codes::NOT_FOUND,
            Error::Unavailable(_) => codes::UNAVAILABLE,
            Error::Io(_) => codes::IO_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_embeds_package() {
        let err = Error::not_found("com.example.mail");
        assert_eq!(err.code(), codes::NOT_FOUND);
        assert_eq!(
            err.to_string(),
            "No application found for package com.example.mail"
        );
    }

    #[test]
    fn test_decoder_errors_are_caller_input() {
        let err: Error = image::load_from_memory(b"not an image").unwrap_err().into();
        assert_eq!(err.code(), codes::INVALID_INPUT);
    }
}
