use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use cobuy_core::domain::order::{LineItem, Order, OrderId, OrderState};
use cobuy_core::domain::product::VariationId;
use cobuy_core::errors::ApplicationError;
use cobuy_core::ports::OrderHistoryPort;

use super::{parse_timestamp, parse_u32, RepositoryError};
use crate::DbPool;

/// Reads completed orders with their line items, oldest placement first.
pub struct SqlOrderHistoryRepository {
    pool: DbPool,
}

impl SqlOrderHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn load_completed(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT o.id, o.state, o.placed_at, i.purchased_entity_id, i.quantity
             FROM commerce_order o
             LEFT JOIN order_item i ON i.order_id = o.id
             WHERE o.state = ?
             ORDER BY o.id ASC, i.position ASC",
        )
        .bind(OrderState::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut orders: Vec<Order> = Vec::new();
        for row in &rows {
            let order_id: String = row.try_get("id")?;
            let starts_new_order = orders.last().map_or(true, |order| order.id.0 != order_id);
            if starts_new_order {
                orders.push(order_header(row, order_id)?);
            }

            if let Some(item) = line_item(row)? {
                if let Some(order) = orders.last_mut() {
                    order.items.push(item);
                }
            }
        }

        // Offsets vary between rows, so placement order is decided on the parsed instant.
        orders.sort_by(|left, right| {
            left.placed_at.cmp(&right.placed_at).then_with(|| left.id.0.cmp(&right.id.0))
        });

        Ok(orders)
    }
}

#[async_trait::async_trait]
impl OrderHistoryPort for SqlOrderHistoryRepository {
    async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.load_completed().await?)
    }
}

fn order_header(row: &SqliteRow, id: String) -> Result<Order, RepositoryError> {
    let state_raw = row.try_get::<String, _>("state")?;
    let state = OrderState::parse(&state_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order state `{state_raw}`")))?;
    let placed_at = parse_timestamp("placed_at", &row.try_get::<String, _>("placed_at")?)?;

    Ok(Order { id: OrderId(id), state, items: Vec::new(), placed_at })
}

/// `None` when the order has no line items at all (the LEFT JOIN produced a bare header row).
fn line_item(row: &SqliteRow) -> Result<Option<LineItem>, RepositoryError> {
    let Some(quantity) = row.try_get::<Option<i64>, _>("quantity")? else {
        return Ok(None);
    };

    Ok(Some(LineItem {
        purchased_entity: row.try_get::<Option<i64>, _>("purchased_entity_id")?.map(VariationId),
        quantity: parse_u32("quantity", quantity)?,
    }))
}
