use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The service answered with an empty body or an HTML error page.
    #[error("agent returned a non-JSON response ({0}); check the base URL and credentials")]
    InvalidJson(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}
