use std::fmt::Display;

use thiserror::Error;

use crate::traits::{OrderStoreError, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("The order has no shipping address")]
    MissingShippingAddress,
    #[error("Product {0} is not in the catalog")]
    UnknownProduct(String),
    #[error("The order has no items")]
    NoItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStep {
    MarkPending,
    TranslateItems,
    TranslateRecipient,
    Submit,
    RecordProviderId,
    Confirm,
    Finalize,
}

impl Display for FulfillmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FulfillmentStep::MarkPending => "mark_pending",
            FulfillmentStep::TranslateItems => "translate_items",
            FulfillmentStep::TranslateRecipient => "translate_recipient",
            FulfillmentStep::Submit => "submit",
            FulfillmentStep::RecordProviderId => "record_provider_id",
            FulfillmentStep::Confirm => "confirm",
            FulfillmentStep::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentErrorKind {
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] OrderStoreError),
}

#[derive(Debug, Clone, Error)]
#[error("Fulfillment failed at step {step}. {kind}")]
pub struct FulfillmentError {
    pub step: FulfillmentStep,
    pub kind: FulfillmentErrorKind,
}

impl FulfillmentError {
    pub fn new<E: Into<FulfillmentErrorKind>>(step: FulfillmentStep, err: E) -> Self {
        Self { step, kind: err.into() }
    }

    /// Returns a closure for use with `map_err` that tags an error with the given step.
    pub fn at<E: Into<FulfillmentErrorKind>>(step: FulfillmentStep) -> impl FnOnce(E) -> Self {
        move |e| Self::new(step, e)
    }
}

/// The only errors [`crate::OrderFlowApi`] returns to its caller. Everything else is handled inside the pipeline.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The event could not be persisted. {0}")]
    PersistenceFailure(#[from] OrderStoreError),
}
