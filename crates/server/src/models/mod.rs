//! Domain types for the fulfillment workflow.
//!
//! These are validated domain objects, separate from any wire format. Foreign
//! keys are plain typed IDs; related entities are looked up on demand through
//! the store rather than materialized as object graphs.

pub mod cart;
pub mod order;
pub mod otp;
pub mod tour;
pub mod user;

pub use cart::{Cart, CartLine};
pub use order::{ContactInfo, Order, OrderLine};
pub use otp::OtpCode;
pub use tour::Tour;
pub use user::User;
