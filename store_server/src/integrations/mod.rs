//! Bindings between the engine's backend traits and the concrete external services.
pub mod email;
pub mod pod;
