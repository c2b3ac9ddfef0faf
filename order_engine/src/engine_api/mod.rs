pub mod errors;
pub mod fulfillment_api;
pub mod notification_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod orders_api;
