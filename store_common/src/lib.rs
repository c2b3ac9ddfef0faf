mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{currency_exponent, MinorUnits, MoneyError};
pub use secret::{constant_time_eq, Secret};
