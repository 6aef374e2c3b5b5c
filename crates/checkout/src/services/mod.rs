//! External service ports used during checkout.

pub mod payment;
pub mod shipping;
