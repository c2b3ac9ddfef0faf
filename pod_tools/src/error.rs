use thiserror::Error;

#[derive(Debug, Error)]
pub enum PodApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider did not respond in time: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for PodApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_builder() || e.is_request() {
            Self::RestRequestError(e.to_string())
        } else {
            Self::RestResponseError(e.to_string())
        }
    }
}
