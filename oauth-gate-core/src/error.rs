use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Provider disabled or misconfigured (e.g. unsupported login strategy)
    #[error("{0}")]
    Configuration(String),

    /// Non-2xx answer from a mandatory provider endpoint
    #[error("Can not get {provider} {resource}. HTTP code: {status}, response: {body}")]
    ProviderProtocol {
        provider: String,
        resource: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Deserialization error: {context}")]
    Deserialization { context: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A side effect requested from the hosting server failed
    #[error("Host error: {0}")]
    Host(String),
}

impl Error {
    pub(crate) fn disabled(provider_name: &str) -> Self {
        Self::Configuration(format!("{provider_name} authentication is disabled"))
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
