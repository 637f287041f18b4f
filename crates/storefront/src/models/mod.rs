//! Domain models for the marketplace.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db::postgres`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod payment;

pub use cart::{CartItem, CartLine, CartView};
pub use catalog::CatalogEntry;
pub use order::{NewOrder, NewOrderLine, Order, OrderDetail, OrderLine, total_of};
pub use payment::{CardDetails, NewPayment, Payment, PaymentOutcome, PaymentReceipt, PaymentResult};
