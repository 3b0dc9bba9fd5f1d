//! Products domain module.
//!
//! This crate contains the catalog's business rules (field coercion, partial
//! updates, filtering and pagination), implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod query;

pub use product::{Price, Product, ProductFields, ProductForm, ProductPatch, ProductView};
pub use query::{PaginationResult, ProductQuery, RawProductQuery, SortOrder};
