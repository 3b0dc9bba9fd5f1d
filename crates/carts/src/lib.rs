//! Carts domain module.
//!
//! Line-item accumulation rules for shopping carts, as pure domain logic.

pub mod cart;

pub use cart::{Cart, LineItem, Quantity};
