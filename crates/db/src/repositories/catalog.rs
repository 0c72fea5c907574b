use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use cobuy_core::domain::price::Price;
use cobuy_core::domain::product::{Product, ProductId, ProductVariation, VariationId};
use cobuy_core::errors::ApplicationError;
use cobuy_core::ports::CatalogPort;

use super::RepositoryError;
use crate::DbPool;

/// Bound variables per IN list, well under SQLite's per-statement limit.
pub(crate) const IN_LIST_CHUNK_SIZE: usize = 500;

const VARIATION_COLUMNS: &str =
    "SELECT id, product_id, sku, price_number, price_currency FROM product_variation";
const PRODUCT_COLUMNS: &str = "SELECT id, title, image_url FROM product";
const VARIATION_BY_ID: &str = "SELECT id, product_id, sku, price_number, price_currency
     FROM product_variation WHERE id = ?";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn variations_in(
        &self,
        ids: &[VariationId],
    ) -> Result<Vec<ProductVariation>, RepositoryError> {
        let ids = ids.iter().map(|id| id.0).collect::<Vec<_>>();
        self.fetch_in_chunks(VARIATION_COLUMNS, ids, variation_from_row).await
    }

    pub(crate) async fn products_in(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let ids = ids.iter().map(|id| id.0).collect::<Vec<_>>();
        self.fetch_in_chunks(PRODUCT_COLUMNS, ids, product_from_row).await
    }

    /// Rows come back in ascending id order, one per distinct id that exists.
    async fn fetch_in_chunks<T>(
        &self,
        select: &str,
        mut ids: Vec<i64>,
        decode: fn(&SqliteRow) -> Result<T, RepositoryError>,
    ) -> Result<Vec<T>, RepositoryError> {
        ids.sort_unstable();
        ids.dedup();

        let mut found = Vec::new();
        for chunk in ids.chunks(IN_LIST_CHUNK_SIZE) {
            let mut query = QueryBuilder::<Sqlite>::new(select);
            query.push(" WHERE id IN (");
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            query.push(") ORDER BY id");

            let rows = query.build().fetch_all(&self.pool).await?;
            for row in &rows {
                found.push(decode(row)?);
            }
        }

        Ok(found)
    }
}

#[async_trait::async_trait]
impl CatalogPort for SqlCatalogRepository {
    async fn find_variation(
        &self,
        id: &VariationId,
    ) -> Result<Option<ProductVariation>, ApplicationError> {
        let row = sqlx::query(VARIATION_BY_ID)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(variation_from_row).transpose()?)
    }

    async fn find_variations(
        &self,
        ids: &[VariationId],
    ) -> Result<Vec<ProductVariation>, ApplicationError> {
        Ok(self.variations_in(ids).await?)
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.products_in(ids).await?)
    }
}

fn variation_from_row(row: &SqliteRow) -> Result<ProductVariation, RepositoryError> {
    let price_raw = row.try_get::<String, _>("price_number")?;

    Ok(ProductVariation {
        id: VariationId(row.try_get("id")?),
        product_id: ProductId(row.try_get("product_id")?),
        sku: row.try_get("sku")?,
        price: Price::new(
            parse_decimal("price_number", &price_raw)?,
            row.try_get::<String, _>("price_currency")?,
        ),
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        title: row.try_get("title")?,
        image_url: row.try_get("image_url")?,
    })
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use cobuy_core::domain::product::{ProductId, VariationId};
    use cobuy_core::errors::ApplicationError;
    use cobuy_core::ports::CatalogPort;

    use super::{SqlCatalogRepository, IN_LIST_CHUNK_SIZE};
    use crate::repositories::test_support::{insert_product, insert_variation, setup_pool};

    #[tokio::test]
    async fn resolves_variations_and_their_products() {
        let pool = setup_pool().await;
        insert_product(&pool, 1, "Trail Tent", Some("https://cdn.example.com/tent.jpg")).await;
        insert_product(&pool, 2, "Camp Stove", None).await;
        insert_variation(&pool, 11, 1, "249.00", "USD").await;
        insert_variation(&pool, 21, 2, "59.99", "USD").await;
        let catalog = SqlCatalogRepository::new(pool.clone());

        let variation =
            catalog.find_variation(&VariationId(21)).await.expect("lookup").expect("variation");
        assert_eq!(variation.product_id, ProductId(2));
        assert_eq!(variation.price.number, Decimal::new(5999, 2));
        assert_eq!(variation.price.currency_code, "USD");
        assert_eq!(catalog.find_variation(&VariationId(99)).await.expect("lookup"), None);

        let variations = catalog
            .find_variations(&[VariationId(21), VariationId(99), VariationId(11)])
            .await
            .expect("bulk lookup");
        assert_eq!(
            variations.iter().map(|variation| variation.id).collect::<Vec<_>>(),
            vec![VariationId(11), VariationId(21)],
            "unknown ids are absent"
        );

        let products =
            catalog.find_products(&[ProductId(1), ProductId(2)]).await.expect("products");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].image_url.as_deref(), Some("https://cdn.example.com/tent.jpg"));
        assert_eq!(products[1].image_url, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn lookups_past_the_bound_variable_limit_are_split() {
        let pool = setup_pool().await;
        insert_product(&pool, 1, "Trail Tent", None).await;
        insert_product(&pool, 40_000, "Camp Stove", None).await;
        insert_variation(&pool, 7, 1, "249.00", "USD").await;
        insert_variation(&pool, 33_000, 40_000, "59.99", "USD").await;
        let catalog = SqlCatalogRepository::new(pool.clone());

        let mut variation_ids = (1..=40_000).rev().map(VariationId).collect::<Vec<_>>();
        variation_ids.push(VariationId(7));
        assert!(variation_ids.len() > 32_766);
        assert!(variation_ids.len() > IN_LIST_CHUNK_SIZE * 2);

        let variations = catalog.find_variations(&variation_ids).await.expect("chunked lookup");
        assert_eq!(
            variations.iter().map(|variation| variation.id).collect::<Vec<_>>(),
            vec![VariationId(7), VariationId(33_000)],
            "duplicates collapse and rows stay in id order"
        );

        let product_ids = (1..=40_000).map(ProductId).collect::<Vec<_>>();
        let products = catalog.find_products(&product_ids).await.expect("chunked products");
        assert_eq!(
            products.iter().map(|product| product.id).collect::<Vec<_>>(),
            vec![ProductId(1), ProductId(40_000)]
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_id_lists_skip_the_database() {
        let pool = setup_pool().await;
        let catalog = SqlCatalogRepository::new(pool.clone());

        assert!(catalog.find_variations(&[]).await.expect("variations").is_empty());
        assert!(catalog.find_products(&[]).await.expect("products").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn malformed_prices_surface_as_persistence_errors() {
        let pool = setup_pool().await;
        insert_product(&pool, 1, "Trail Tent", None).await;
        insert_variation(&pool, 11, 1, "not-a-number", "USD").await;
        let catalog = SqlCatalogRepository::new(pool.clone());

        let error = catalog.find_variation(&VariationId(11)).await.expect_err("decode failure");
        assert!(matches!(error, ApplicationError::Persistence(_)));

        pool.close().await;
    }
}
