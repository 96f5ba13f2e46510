use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidUrl { input: String, reason: String },
    UnsupportedScheme { scheme: String },
    MissingHost { input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidUrl { input, reason } => write!(f, "invalid URL {input:?}: {reason}"),
            Self::UnsupportedScheme { scheme } => {
                write!(f, "unsupported URL scheme: {scheme} (expected http or https)")
            }
            Self::MissingHost { input } => write!(f, "URL has no host: {input}"),
        }
    }
}

impl std::error::Error for ValidationError {}
