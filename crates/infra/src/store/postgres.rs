//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Other | N/A | `Backend` |
//!
//! Monetary amounts are stored in minor units; cart line items as JSONB.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use storefront_auth::{Role, User};
use storefront_carts::{Cart, LineItem};
use storefront_core::{CartId, ExpectedVersion, ProductId, UserId};
use storefront_products::{PaginationResult, Price, Product, ProductPatch, ProductQuery, SortOrder};

use super::{CartStore, ProductStore, StoreError, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price_minor BIGINT NOT NULL CHECK (price_minor >= 0),
        thumbnails  JSONB NOT NULL DEFAULT '[]'::jsonb,
        code        TEXT NOT NULL UNIQUE,
        stock       BIGINT NOT NULL CHECK (stock >= 0),
        status      BOOLEAN NOT NULL,
        category    TEXT NOT NULL,
        owner       TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        first_name    TEXT NOT NULL,
        last_name     TEXT NOT NULL,
        role          TEXT NOT NULL,
        cart_id       UUID NULL,
        last_activity TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS carts (
        id      UUID PRIMARY KEY,
        items   JSONB NOT NULL DEFAULT '[]'::jsonb,
        version BIGINT NOT NULL DEFAULT 0
    )
    "#,
];

/// Create the storefront tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode_error(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {what} row: {err}"))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, what: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(format!("failed to encode {what}: {e}")))
}

fn to_i64(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{what} out of range")))
}

/// Narrow a BIGINT column; a value that does not fit is a corrupt row.
fn column_value<T: TryFrom<i64>>(value: i64, what: &str) -> Result<T, StoreError> {
    T::try_from(value).map_err(|_| decode_error(what, format!("{value} out of range")))
}

// -------------------------
// Products
// -------------------------

const PRODUCT_COLUMNS: &str =
    "id, title, description, price_minor, thumbnails, code, stock, status, category, owner, created_at";

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let price: i64 = row.try_get("price_minor").map_err(|e| decode_error("product", e))?;
    let stock: i64 = row.try_get("stock").map_err(|e| decode_error("product", e))?;
    let thumbnails: serde_json::Value = row.try_get("thumbnails").map_err(|e| decode_error("product", e))?;

    let price: u64 = column_value(price, "product price")?;
    let stock: u32 = column_value(stock, "product stock")?;
    let thumbnails: Vec<String> =
        serde_json::from_value(thumbnails).map_err(|e| decode_error("product thumbnails", e))?;

    let read = || -> Result<Product, sqlx::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: Price::from_minor(price),
            thumbnails,
            code: row.try_get("code")?,
            stock,
            status: row.try_get("status")?,
            category: row.try_get("category")?,
            owner: row.try_get("owner")?,
            created_at: row.try_get("created_at")?,
        })
    };
    read().map_err(|e| decode_error("product", e))
}

/// Appends the WHERE clause for `query`'s filters.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) -> Result<(), StoreError> {
    builder.push(" WHERE TRUE");
    if let Some(category) = &query.category {
        builder.push(" AND lower(category) = lower(").push_bind(category.clone()).push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price_minor >= ").push_bind(to_i64(min.minor_units(), "min_price")?);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price_minor <= ").push_bind(to_i64(max.minor_units(), "max_price")?);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, description, price_minor, thumbnails,
                code, stock, status, category, owner, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(to_i64(product.price.minor_units(), "price")?)
        .bind(to_json(&product.thumbnails, "thumbnails")?)
        .bind(&product.code)
        .bind(i64::from(product.stock))
        .bind(product.status)
        .bind(&product.category)
        .bind(&product.owner)
        .bind(product.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = $1"))
            .bind(code)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_code", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn query(&self, query: &ProductQuery) -> Result<PaginationResult<Product>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM products");
        push_filters(&mut count, query)?;
        let total: i64 = count
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?
            .try_get("total")
            .map_err(|e| decode_error("count", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut select, query)?;
        select.push(match query.sort {
            Some(SortOrder::Asc) => " ORDER BY price_minor ASC, id ASC",
            Some(SortOrder::Desc) => " ORDER BY price_minor DESC, id ASC",
            None => " ORDER BY id ASC",
        });
        select
            .push(" LIMIT ")
            .push_bind(to_i64(query.limit as u64, "limit")?)
            .push(" OFFSET ")
            .push_bind(to_i64(query.offset() as u64, "offset")?);

        let rows = select
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_products", e))?;
        let items = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(PaginationResult::new(
            items,
            column_value(total, "product count")?,
            query.page,
            query.limit,
        ))
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn merge(&self, id: ProductId, patch: &ProductPatch) -> Result<Option<Product>, StoreError> {
        let price = patch
            .price
            .map(|p| to_i64(p.minor_units(), "price"))
            .transpose()?;
        let thumbnails = patch
            .thumbnails
            .as_ref()
            .map(|t| to_json(t, "thumbnails"))
            .transpose()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                title       = COALESCE($2, title),
                description = COALESCE($3, description),
                price_minor = COALESCE($4, price_minor),
                thumbnails  = COALESCE($5, thumbnails),
                code        = COALESCE($6, code),
                stock       = COALESCE($7, stock),
                status      = COALESCE($8, status),
                category    = COALESCE($9, category)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(price)
        .bind(thumbnails)
        .bind(patch.code.as_deref())
        .bind(patch.stock.map(i64::from))
        .bind(patch.status)
        .bind(patch.category.as_deref())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("merge_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }
}

// -------------------------
// Users
// -------------------------

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, cart_id, last_activity";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role").map_err(|e| decode_error("user", e))?;
    let role: Role = role.parse().map_err(|e| decode_error("user", e))?;
    let read = || -> Result<User, sqlx::Error> {
        let cart: Option<uuid::Uuid> = row.try_get("cart_id")?;
        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            role,
            cart_id: cart.map(CartId::from_uuid),
            last_activity: row.try_get("last_activity")?,
        })
    };
    read().map_err(|e| decode_error("user", e))
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, role, cart_id, last_activity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.cart_id.map(|c| *c.as_uuid()))
        .bind(user.last_activity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY email ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE last_activity < $1 ORDER BY last_activity ASC, id ASC"
        ))
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("inactive_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(role.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_user_role", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn touch(&self, id: UserId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET last_activity = GREATEST(last_activity, $2) WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("touch_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// The account row and its cart go in one transaction.
    #[instrument(skip(self), err)]
    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("DELETE FROM users WHERE id = $1 RETURNING cart_id")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        let Some(row) = row else {
            return Ok(false);
        };

        let cart: Option<uuid::Uuid> = row.try_get("cart_id").map_err(|e| decode_error("user", e))?;
        if let Some(cart) = cart {
            sqlx::query("DELETE FROM carts WHERE id = $1")
                .bind(cart)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_user_cart", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(true)
    }
}

// -------------------------
// Carts
// -------------------------

#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn create(&self, cart: Cart) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO carts (id, items, version) VALUES ($1, $2, $3)")
            .bind(cart.id.as_uuid())
            .bind(to_json(cart.items(), "cart items")?)
            .bind(to_i64(cart.version, "version")?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_cart", e))?;
        Ok(())
    }

    async fn get(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query("SELECT id, items, version FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_cart", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let items: serde_json::Value = row.try_get("items").map_err(|e| decode_error("cart", e))?;
        let items: Vec<LineItem> = serde_json::from_value(items).map_err(|e| decode_error("cart", e))?;
        let version: i64 = row.try_get("version").map_err(|e| decode_error("cart", e))?;
        let version: u64 = column_value(version, "cart version")?;
        let cart = Cart::from_parts(id, items, version).map_err(|e| decode_error("cart", e))?;
        Ok(Some(cart))
    }

    /// The version check and the write happen in one conditional UPDATE, so a
    /// concurrent writer makes this affect zero rows.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id, expected = ?expected), err)]
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(to_i64(v, "version")?),
        };
        let row = sqlx::query(
            r#"
            UPDATE carts
            SET items = $2, version = version + 1
            WHERE id = $1 AND ($3::BIGINT IS NULL OR version = $3)
            RETURNING version
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(to_json(cart.items(), "cart items")?)
        .bind(expected_version)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_cart", e))?;

        if let Some(row) = row {
            let version: i64 = row.try_get("version").map_err(|e| decode_error("cart", e))?;
            return column_value(version, "cart version");
        }

        // Zero rows: either the version moved or the cart is gone.
        let exists = sqlx::query("SELECT 1 FROM carts WHERE id = $1")
            .bind(cart.id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_cart", e))?
            .is_some();
        if exists {
            Err(StoreError::Conflict(format!("cart {} (expected: {expected:?})", cart.id)))
        } else {
            Err(StoreError::Missing(format!("cart {}", cart.id)))
        }
    }

    async fn delete(&self, id: CartId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_or_oversized_columns_are_decode_errors() {
        assert_eq!(column_value::<u64>(1250, "price"), Ok(1250));
        assert!(matches!(column_value::<u64>(-1, "price"), Err(StoreError::Backend(_))));
        assert!(matches!(column_value::<u32>(-3, "stock"), Err(StoreError::Backend(_))));
        assert!(matches!(
            column_value::<u32>(i64::from(u32::MAX) + 1, "stock"),
            Err(StoreError::Backend(_))
        ));
    }
}
