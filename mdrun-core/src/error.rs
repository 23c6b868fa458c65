use thiserror::Error;

/// Why an inbound request was dropped.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("not a valid request address: {0}")]
    InvalidUri(#[from] url::ParseError),

    #[error("request has no `cmd` parameter")]
    MissingCommand,

    #[error("`cmd` is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("`cmd` does not decode to UTF-8 text")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("decoded command is empty")]
    EmptyCommand,

    #[error("malformed percent-encoding at byte {0}")]
    MalformedPercentEncoding(usize),
}

impl RequestError {
    /// Silent drops are expected traffic; the rest are logged as errors.
    pub fn is_silent(&self) -> bool {
        matches!(self, RequestError::MissingCommand | RequestError::EmptyCommand)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
