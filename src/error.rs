use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("no organizations found for the authenticated user")]
    NoOrganizations,

    #[error("api request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirrorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingConfig(_) => "missing_config",
            Self::NoOrganizations => "no_organizations",
            Self::Api { .. } => "api_error",
            Self::Http(_) => "http_error",
            Self::Logging(_) => "logging_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
