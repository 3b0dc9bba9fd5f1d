use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use storefront_core::{CartId, DomainError, DomainResult, Entity, ProductId};

/// A strictly positive item count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    pub const ONE: Quantity = Quantity(NonZeroU32::MIN);

    pub fn new(n: u32) -> DomainResult<Self> {
        NonZeroU32::new(n)
            .map(Self)
            .ok_or_else(|| DomainError::validation("quantity must be a positive integer"))
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    pub fn checked_add(self, other: Quantity) -> DomainResult<Quantity> {
        self.0
            .checked_add(other.get())
            .map(Self)
            .ok_or_else(|| DomainError::validation("quantity overflow"))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        u32::try_from(n)
            .map_err(|_| DomainError::validation("quantity must be a positive integer"))
            .and_then(Quantity::new)
    }
}

/// A (product, quantity) pair within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A shopping cart.
///
/// # Invariants
/// - At most one line item per product.
/// - Line items keep the order in which products were first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    items: Vec<LineItem>,
    /// Bumped by the store on every successful save.
    pub version: u64,
}

impl Cart {
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            items: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild from stored line items, merging any duplicates.
    pub fn from_parts(id: CartId, items: Vec<LineItem>, version: u64) -> DomainResult<Self> {
        let mut cart = Self { id, items: Vec::with_capacity(items.len()), version };
        for item in items {
            cart.add(item.product_id, item.quantity)?;
        }
        Ok(cart)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<Quantity> {
        self.items
            .iter()
            .find(|i| &i.product_id == product_id)
            .map(|i| i.quantity)
    }

    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.get())).sum()
    }

    /// Add `quantity` of a product: increments the existing line or appends one.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity) -> DomainResult<()> {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.checked_add(quantity)?,
            None => self.items.push(LineItem { product_id, quantity }),
        }
        Ok(())
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
