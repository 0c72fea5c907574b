use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use cobuy_core::domain::cart::{
    Cart, CartId, CartKey, CartLineItem, CartType, SessionId, StoreId, UserId,
};
use cobuy_core::domain::price::Price;
use cobuy_core::domain::product::VariationId;
use cobuy_core::errors::ApplicationError;
use cobuy_core::ports::CartPort;

use super::catalog::parse_decimal;
use super::{parse_timestamp, parse_u32, RepositoryError};
use crate::DbPool;

pub struct SqlCartRepository {
    pool: DbPool,
}

impl SqlCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn cart_by_key(&self, key: &CartKey) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, session_id, store_id, cart_type, user_id, created_at
             FROM cart WHERE session_id = ? AND store_id = ? AND cart_type = ?",
        )
        .bind(&key.session_id.0)
        .bind(&key.store_id.0)
        .bind(key.cart_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut cart = cart_from_row(&row)?;
        cart.items = self.items_for(&cart.id).await?;
        Ok(Some(cart))
    }

    async fn items_for(&self, cart_id: &CartId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT variation_id, quantity, unit_price_number, unit_price_currency
             FROM cart_item WHERE cart_id = ? ORDER BY id",
        )
        .bind(&cart_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(line_item_from_row).collect()
    }

    /// Racing creators for the same key converge on whichever row landed first.
    async fn insert_cart(
        &self,
        key: &CartKey,
        user_id: Option<&UserId>,
    ) -> Result<Cart, RepositoryError> {
        sqlx::query(
            "INSERT INTO cart (id, session_id, store_id, cart_type, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id, store_id, cart_type) DO NOTHING",
        )
        .bind(format!("cart-{}", Uuid::new_v4()))
        .bind(&key.session_id.0)
        .bind(&key.store_id.0)
        .bind(key.cart_type.as_str())
        .bind(user_id.map(|user| user.0.as_str()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.cart_by_key(key).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "cart for session `{}` vanished after insert",
                key.session_id.0
            ))
        })
    }

    async fn insert_line_item(
        &self,
        cart_id: &CartId,
        line_item: &CartLineItem,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_item
                (cart_id, variation_id, quantity, unit_price_number, unit_price_currency, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&cart_id.0)
        .bind(line_item.variation_id.0)
        .bind(i64::from(line_item.quantity))
        .bind(line_item.unit_price.number.to_string())
        .bind(&line_item.unit_price.currency_code)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CartPort for SqlCartRepository {
    async fn find_cart(&self, key: &CartKey) -> Result<Option<Cart>, ApplicationError> {
        Ok(self.cart_by_key(key).await?)
    }

    async fn create_cart(
        &self,
        key: &CartKey,
        user_id: Option<&UserId>,
    ) -> Result<Cart, ApplicationError> {
        Ok(self.insert_cart(key, user_id).await?)
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        line_item: CartLineItem,
    ) -> Result<(), ApplicationError> {
        Ok(self.insert_line_item(cart_id, &line_item).await?)
    }
}

fn cart_from_row(row: &SqliteRow) -> Result<Cart, RepositoryError> {
    let cart_type_raw = row.try_get::<String, _>("cart_type")?;
    let cart_type = match cart_type_raw.as_str() {
        "default" => CartType::Default,
        other => return Err(RepositoryError::Decode(format!("unknown cart type `{other}`"))),
    };

    Ok(Cart {
        id: CartId(row.try_get("id")?),
        key: CartKey {
            session_id: SessionId(row.try_get("session_id")?),
            store_id: StoreId(row.try_get("store_id")?),
            cart_type,
        },
        user_id: row.try_get::<Option<String>, _>("user_id")?.map(UserId),
        items: Vec::new(),
        created_at: parse_timestamp("created_at", &row.try_get::<String, _>("created_at")?)?,
    })
}

fn line_item_from_row(row: &SqliteRow) -> Result<CartLineItem, RepositoryError> {
    let number_raw = row.try_get::<String, _>("unit_price_number")?;

    Ok(CartLineItem {
        variation_id: VariationId(row.try_get("variation_id")?),
        quantity: parse_u32("quantity", row.try_get("quantity")?)?,
        unit_price: Price::new(
            parse_decimal("unit_price_number", &number_raw)?,
            row.try_get::<String, _>("unit_price_currency")?,
        ),
    })
}
