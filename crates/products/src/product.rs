use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_auth::{Actor, Owned};
use storefront_core::{DomainError, DomainResult, Entity, ProductId};

/// Price in the smallest currency unit (e.g. cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_minor(units: u64) -> Self {
        Self(units)
    }

    pub fn minor_units(&self) -> u64 {
        self.0
    }

    /// Coerce a price given in major units ("12.5", 12.5) into minor units.
    pub fn coerce(value: &JsonValue) -> DomainResult<Self> {
        let major = match value {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| DomainError::validation(format!("price '{value}' is not numeric")))?;

        if !major.is_finite() || major < 0.0 {
            return Err(DomainError::validation(format!(
                "price must be a non-negative number (got {major})"
            )));
        }
        let minor = (major * 100.0).round();
        if minor > u64::MAX as f64 {
            return Err(DomainError::validation("price is out of range"));
        }
        Ok(Self(minor as u64))
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

fn coerce_stock(value: &JsonValue) -> DomainResult<u32> {
    let invalid = || DomainError::validation(format!("stock '{value}' is not a non-negative integer"));
    let n = match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;
    u32::try_from(n).map_err(|_| invalid())
}

/// Listing status arrives in its serialized form (`"true"` / `"false"`) from
/// form posts, or as a JSON boolean.
fn parse_status(value: &JsonValue) -> DomainResult<bool> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::String(s) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(DomainError::validation(format!("status '{other}' is not a boolean"))),
        },
        other => Err(DomainError::validation(format!("status '{other}' is not a boolean"))),
    }
}

fn required_text(name: &str, value: Option<String>) -> DomainResult<String> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{name} is required")));
    }
    Ok(value)
}

fn patched_text(name: &str, value: Option<String>) -> DomainResult<Option<String>> {
    value.map(|v| required_text(name, Some(v))).transpose()
}

// -------------------------
// Raw input
// -------------------------

/// Product fields as submitted by a client, before coercion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<JsonValue>,
    #[serde(default, alias = "thumbnail")]
    pub thumbnails: Option<Vec<String>>,
    pub code: Option<String>,
    pub stock: Option<JsonValue>,
    pub status: Option<JsonValue>,
    pub category: Option<String>,
}

impl ProductForm {
    /// Validate a complete set of fields for a new product.
    pub fn into_fields(self) -> DomainResult<ProductFields> {
        let price = self
            .price
            .as_ref()
            .ok_or_else(|| DomainError::validation("price is required"))
            .and_then(Price::coerce)?;
        let stock = self
            .stock
            .as_ref()
            .ok_or_else(|| DomainError::validation("stock is required"))
            .and_then(coerce_stock)?;
        let status = self
            .status
            .as_ref()
            .ok_or_else(|| DomainError::validation("status is required"))
            .and_then(parse_status)?;

        Ok(ProductFields {
            title: required_text("title", self.title)?,
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            price,
            thumbnails: self.thumbnails.unwrap_or_default(),
            code: required_text("code", self.code)?,
            stock,
            status,
            category: required_text("category", self.category)?,
        })
    }

    /// Validate only the fields present, for a partial update.
    pub fn into_patch(self) -> DomainResult<ProductPatch> {
        Ok(ProductPatch {
            title: patched_text("title", self.title)?,
            description: self.description.map(|d| d.trim().to_string()),
            price: self.price.as_ref().map(Price::coerce).transpose()?,
            thumbnails: self.thumbnails,
            code: patched_text("code", self.code)?,
            stock: self.stock.as_ref().map(coerce_stock).transpose()?,
            status: self.status.as_ref().map(parse_status).transpose()?,
            category: patched_text("category", self.category)?,
        })
    }
}

// -------------------------
// Validated input
// -------------------------

/// Coerced fields of a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub thumbnails: Vec<String>,
    pub code: String,
    pub stock: u32,
    pub status: bool,
    pub category: String,
}

/// Partial update: `None` keeps the stored value.
///
/// Owner and id are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub thumbnails: Option<Vec<String>>,
    pub code: Option<String>,
    pub stock: Option<u32>,
    pub status: Option<bool>,
    pub category: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

// -------------------------
// Entity
// -------------------------

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub thumbnails: Vec<String>,
    pub code: String,
    pub stock: u32,
    pub status: bool,
    pub category: String,
    /// Email of the user who created the product.
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(id: ProductId, fields: ProductFields, owner: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            price: fields.price,
            thumbnails: fields.thumbnails,
            code: fields.code,
            stock: fields.stock,
            status: fields.status,
            category: fields.category,
            owner: owner.into(),
            created_at: now,
        }
    }

    pub fn is_listed(&self) -> bool {
        self.status
    }

    /// Merge `patch` into this product. Applying the same patch twice is a no-op
    /// the second time.
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(v) = &patch.title {
            self.title = v.clone();
        }
        if let Some(v) = &patch.description {
            self.description = v.clone();
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(v) = &patch.thumbnails {
            self.thumbnails = v.clone();
        }
        if let Some(v) = &patch.code {
            self.code = v.clone();
        }
        if let Some(v) = patch.stock {
            self.stock = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = &patch.category {
            self.category = v.clone();
        }
    }

    pub fn patched(mut self, patch: &ProductPatch) -> Self {
        self.apply_patch(patch);
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Product {
    fn is_owned_by(&self, actor: &Actor) -> bool {
        actor.is_email(&self.owner)
    }
}

// -------------------------
// Output DTO
// -------------------------

/// Normalized product representation handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub thumbnails: Vec<String>,
    pub code: String,
    pub stock: u32,
    pub status: bool,
    pub category: String,
    pub owner: String,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.to_string(),
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price.to_string(),
            thumbnails: p.thumbnails.clone(),
            code: p.code.clone(),
            stock: p.stock,
            status: p.status,
            category: p.category.clone(),
            owner: p.owner.clone(),
        }
    }
}
