use std::time::Duration;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use order_engine::{OrderFlowError, OrderStoreError, SignatureError};
use pod_tools::PodApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Payment event rejected. {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The payment event could not be recorded. {0}")]
    PersistenceFailure(String),
    #[error("The payment event was not handled within {0:?}")]
    WebhookTimeout(Duration),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("A valid API key is required")]
    Unauthorized,
    #[error("Requests from {0} are not accepted")]
    ForbiddenPeer(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ForbiddenPeer(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WebhookTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::PersistenceFailure(e) => Self::PersistenceFailure(e.to_string()),
        }
    }
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<PodApiError> for ServerError {
    fn from(e: PodApiError) -> Self {
        Self::InitializeError(format!("Print-on-demand client. {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::from(SignatureError::MissingHeader).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServerError::WebhookTimeout(Duration::from_secs(25)).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = ServerError::from(OrderFlowError::PersistenceFailure(OrderStoreError::DatabaseError("locked".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_bodies_are_json() {
        let res = ServerError::NoRecordFound("Order ORD-1 does not exist".into()).error_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
    }
}
