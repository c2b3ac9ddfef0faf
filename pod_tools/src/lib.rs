//! Client for the print-on-demand (POD) provider that manufactures and ships physical goods.
//!
//! The provider's order lifecycle is two-phase: [`PodApi::create_order`] creates a *draft* order on the provider side,
//! and [`PodApi::confirm_order`] releases the draft for production. Drafts are never charged or manufactured, which
//! is what makes it safe to record the provider id before confirming.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::PodApi;
pub use config::PodConfig;
pub use data_objects::{NewPodOrder, PodFile, PodLineItem, PodOrder, PodRecipient, PodResponse};
pub use error::PodApiError;
