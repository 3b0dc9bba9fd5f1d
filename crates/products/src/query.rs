//! Catalog filtering and pagination.
//!
//! Storage backends may push filtering down (e.g. into SQL), but the ordering
//! and page metadata defined here are the contract every backend must honour.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::{DomainError, DomainResult};

use crate::product::{Price, Product};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Sort by price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query-string parameters as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProductQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

/// Validated catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub limit: usize,
    /// 1-based page number.
    pub page: usize,
    pub sort: Option<SortOrder>,
    pub category: Option<String>,
    pub status: Option<bool>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            sort: None,
            category: None,
            status: None,
            min_price: None,
            max_price: None,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_positive(name: &str, v: Option<String>) -> DomainResult<Option<usize>> {
    non_empty(v)
        .map(|s| {
            s.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| DomainError::validation(format!("{name} must be a positive integer")))
        })
        .transpose()
}

impl ProductQuery {
    pub fn parse(raw: RawProductQuery) -> DomainResult<Self> {
        let limit = parse_positive("limit", raw.limit)?
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        let page = parse_positive("page", raw.page)?.unwrap_or(1);

        let sort = match non_empty(raw.sort).map(|s| s.to_ascii_lowercase()).as_deref() {
            None => None,
            Some("asc") => Some(SortOrder::Asc),
            Some("desc") => Some(SortOrder::Desc),
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "sort must be 'asc' or 'desc' (got '{other}')"
                )));
            }
        };

        let status = match non_empty(raw.status).as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(DomainError::validation(format!("status '{other}' is not a boolean")));
            }
        };

        let min_price = non_empty(raw.min_price)
            .map(|s| Price::coerce(&JsonValue::String(s)))
            .transpose()?;
        let max_price = non_empty(raw.max_price)
            .map(|s| Price::coerce(&JsonValue::String(s)))
            .transpose()?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(DomainError::validation("min_price is greater than max_price"));
            }
        }

        Ok(Self {
            limit,
            page,
            sort,
            category: non_empty(raw.category),
            status,
            min_price,
            max_price,
        })
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn matches(&self, p: &Product) -> bool {
        if let Some(category) = &self.category {
            if !p.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if p.status != status {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if p.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if p.price > max {
                return false;
            }
        }
        true
    }

    /// Total order used for stable pagination: the requested price order, then id.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let by_price = match self.sort {
            Some(SortOrder::Asc) => a.price.cmp(&b.price),
            Some(SortOrder::Desc) => b.price.cmp(&a.price),
            None => Ordering::Equal,
        };
        by_price.then_with(|| a.id.cmp(&b.id))
    }

    /// Filter, order and slice an in-memory catalog.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> PaginationResult<Product> {
        let mut matching: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| self.compare(a, b));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(self.offset())
            .take(self.limit)
            .collect();
        PaginationResult::new(items, total, self.page, self.limit)
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub total_items: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub page: usize,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl<T> PaginationResult<T> {
    pub fn new(items: Vec<T>, total_items: usize, page: usize, limit: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total_items.div_ceil(limit).max(1);

        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;
        let prev_page = has_prev_page.then(|| page - 1);
        let next_page = has_next_page.then(|| page + 1);

        Self {
            items,
            total_items,
            limit,
            total_pages,
            page,
            prev_page,
            next_page,
            has_prev_page,
            has_next_page,
            prev_link: prev_page.map(page_link),
            next_link: next_page.map(page_link),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginationResult<U> {
        PaginationResult {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            limit: self.limit,
            total_pages: self.total_pages,
            page: self.page,
            prev_page: self.prev_page,
            next_page: self.next_page,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_link: self.prev_link,
            next_link: self.next_link,
        }
    }
}

fn page_link(page: usize) -> String {
    format!("/products?page={page}")
}
