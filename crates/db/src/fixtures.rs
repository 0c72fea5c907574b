use serde::Serialize;
use sqlx::Executor;
use tracing::info;

use cobuy_core::{
    BuyTogetherService, ExactMatchAggregator, RecommendationBuilder, SymbolCurrencyFormatter,
};

use crate::connection::DbPool;
use crate::repositories::{
    RepositoryError, SqlCartRepository, SqlCatalogRepository, SqlOrderHistoryRepository,
};

const SEED_PRODUCT_IDS: &[i64] = &[1, 2, 3, 4, 5, 6];
const SEED_VARIATION_IDS: &[i64] = &[101, 102, 201, 301, 401, 501, 601];
const SEED_ORDER_IDS: &[&str] = &[
    "ord-1001", "ord-1002", "ord-1003", "ord-1004", "ord-1005", "ord-1006", "ord-1007",
    "ord-1008", "ord-1009",
];
const SEED_COMPLETED_ORDERS: i64 = 7;

/// Signature the demo history must produce, and how many orders share it.
pub const EXPECTED_WINNER_SIGNATURE: &str = "101_201_301";
pub const EXPECTED_WINNER_COUNT: u32 = 3;
pub const EXPECTED_WINNER_TOTAL: &str = "$438.49";
const SEED_CURRENCY: &str = "USD";

/// Deterministic outdoor-gear storefront with one clear "bought together" winner.
///
/// The history exercises every skip path: a canceled and a placed order with an otherwise
/// popular set, an order below the size floor, a superset order, and an order carrying an
/// orphaned line item plus a reference to a variation that no longer exists.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        info!(
            event_name = "db.seed.loaded",
            products = SEED_PRODUCT_IDS.len(),
            variations = SEED_VARIATION_IDS.len(),
            orders = SEED_ORDER_IDS.len(),
            "demo seed dataset loaded"
        );

        Ok(SeedResult {
            products_seeded: SEED_PRODUCT_IDS.len(),
            variations_seeded: SEED_VARIATION_IDS.len(),
            orders_seeded: SEED_ORDER_IDS.len(),
            expected_winner: EXPECTED_WINNER_SIGNATURE,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let products: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("catalog-products", products == SEED_PRODUCT_IDS.len() as i64));

        let variations: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product_variation WHERE id IN {}",
            sql_array_from_ids(SEED_VARIATION_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("catalog-variations", variations == SEED_VARIATION_IDS.len() as i64));

        let quoted_orders =
            SEED_ORDER_IDS.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
        let completed: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM commerce_order WHERE state = 'completed' AND id IN ({quoted_orders})"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("completed-orders", completed == SEED_COMPLETED_ORDERS));

        let (winner, total) = Self::recommendation_matches(pool).await?;
        checks.push(("expected-winner", winner));
        checks.push(("expected-total", total));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Runs the aggregation and projection against the stored history, exactly as a storefront
    /// request would.
    async fn recommendation_matches(pool: &DbPool) -> Result<(bool, bool), RepositoryError> {
        let service = BuyTogetherService::new(
            SqlOrderHistoryRepository::new(pool.clone()),
            SqlCatalogRepository::new(pool.clone()),
            SqlCartRepository::new(pool.clone()),
            ExactMatchAggregator,
            RecommendationBuilder::new(SymbolCurrencyFormatter, SEED_CURRENCY),
        );

        let Some(resolved) = service.most_frequent_set().await? else {
            return Ok((false, false));
        };
        let winner = resolved.set_count.signature.as_str() == EXPECTED_WINNER_SIGNATURE
            && resolved.set_count.count == EXPECTED_WINNER_COUNT;
        let total = service
            .build_view(&resolved)
            .is_ok_and(|view| view.total_price == EXPECTED_WINNER_TOTAL);

        Ok((winner, total))
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_orders =
            SEED_ORDER_IDS.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
        sqlx::query(&format!("DELETE FROM order_item WHERE order_id IN ({quoted_orders})"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM commerce_order WHERE id IN ({quoted_orders})"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM product_variation WHERE id IN {}",
            sql_array_from_ids(SEED_VARIATION_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub variations_seeded: usize,
    pub orders_seeded: usize,
    pub expected_winner: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seed fixtures");
        pool
    }

    #[test]
    fn sql_fixture_is_present() {
        assert!(DemoSeedDataset::SQL.contains("INSERT OR IGNORE INTO commerce_order"));
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = seeded_pool().await;

        let first = DemoSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first.all_present, "checks: {:?}", first.checks);

        let reload = DemoSeedDataset::load(&pool).await.expect("reload seed fixtures");
        assert_eq!(reload.orders_seeded, SEED_ORDER_IDS.len());
        let second = DemoSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert_eq!(first.checks, second.checks);

        let order_items: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM order_item")
            .fetch_one(&pool)
            .await
            .expect("count order items");
        assert_eq!(order_items, 29, "reloading must not duplicate line items");

        pool.close().await;
    }

    #[tokio::test]
    async fn verification_fails_once_the_history_changes() {
        let pool = seeded_pool().await;

        sqlx::query("UPDATE commerce_order SET state = 'canceled' WHERE id = 'ord-1009'")
            .execute(&pool)
            .await
            .expect("cancel order");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("completed-orders", false)));
        assert!(verification.checks.contains(&("expected-winner", false)));

        pool.close().await;
    }

    #[tokio::test]
    async fn verification_checks_the_rendered_total() {
        let pool = seeded_pool().await;

        sqlx::query("UPDATE product_variation SET price_number = '60.00' WHERE id = 301")
            .execute(&pool)
            .await
            .expect("reprice stove");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.checks.contains(&("expected-winner", true)));
        assert!(verification.checks.contains(&("expected-total", false)));
        assert!(!verification.all_present);

        pool.close().await;
    }

    #[tokio::test]
    async fn clean_removes_every_seeded_row() {
        let pool = seeded_pool().await;

        DemoSeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.checks.iter().all(|(_, ok)| !ok));

        pool.close().await;
    }
}
