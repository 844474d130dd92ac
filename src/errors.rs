use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("{context}: transport failure{}: {message}", http_status(.status))]
    Transport {
        context: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{context}: malformed response from the judge: {message}")]
    MalformedResponse { context: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to read source {path}: {message}")]
    Source { path: String, message: String },
}

pub use Error::*;

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn transport(context: impl Into<String>, error: reqwest::Error) -> Self {
        Transport {
            context: context.into(),
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }

    pub fn malformed(context: impl Into<String>, message: impl ToString) -> Self {
        MalformedResponse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
