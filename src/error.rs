use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable fetching error: {0}")]
    EnvVarNotSet(#[from] dotenvy::Error),
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("WHOIS lookup failed: {0}")]
    Whois(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
    #[error("failed to fetch whois: {0}")]
    Fetch(Box<Error>),
    #[error("whois fetch cancelled")]
    Cancelled,
    #[error("could not find expiration date")]
    NoExpiration,
    #[error("failed to diff status: {0}")]
    Diff(String),
    #[error("missing configuration: {0}")]
    NotConfigured(&'static str),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

impl Error {
    /// Whether the registry could not be reached for this attempt.
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::Cancelled)
    }
}
