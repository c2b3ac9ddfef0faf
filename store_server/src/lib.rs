//! # Store server
//! This crate hosts the HTTP side of the storefront payment pipeline. It is responsible for:
//! * Listening for signed payment events from the payment gateway and handing verified events to the order engine.
//! * Binding the engine's provider and notifier contracts to the print-on-demand API and the email service.
//! * Serving a small, API-key protected, read-only view of the stored orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhooks/payment`: The webhook route for payment gateway events.
//! * `/api/orders` and `/api/orders/{order_id}`: Order listings, only mounted when an admin API key is configured.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
