//! Workflow services.
//!
//! Each service is request-scoped: constructed over borrowed collaborators,
//! it runs one operation to completion and holds no state of its own.

pub mod cart;
pub mod orders;
pub mod otp;

pub use cart::{CartAggregator, CartError};
pub use orders::{OrderError, OrderStateMachine};
pub use otp::{OtpError, OtpLedger};
