use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::RwLock;

use cobuy_core::domain::cart::{Cart, CartId, CartKey, CartLineItem, UserId};
use cobuy_core::domain::order::Order;
use cobuy_core::domain::product::{Product, ProductId, ProductVariation, VariationId};
use cobuy_core::errors::ApplicationError;
use cobuy_core::ports::{CartPort, CatalogPort, OrderHistoryPort};

#[derive(Default)]
pub struct InMemoryOrderHistory {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderHistory {
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self { orders: RwLock::new(orders) }
    }

    pub async fn record(&self, order: Order) {
        self.orders.write().await.push(order);
    }
}

#[async_trait::async_trait]
impl OrderHistoryPort for InMemoryOrderHistory {
    async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        let orders = self.orders.read().await;
        let mut completed =
            orders.iter().filter(|order| order.is_completed()).cloned().collect::<Vec<_>>();
        completed.sort_by(|left, right| {
            left.placed_at.cmp(&right.placed_at).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(completed)
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    variations: RwLock<BTreeMap<VariationId, ProductVariation>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>, variations: Vec<ProductVariation>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
            variations: RwLock::new(variations.into_iter().map(|v| (v.id, v)).collect()),
        }
    }

    pub async fn save_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn save_variation(&self, variation: ProductVariation) {
        self.variations.write().await.insert(variation.id, variation);
    }

    /// Simulates a variation deleted after it was ordered.
    pub async fn remove_variation(&self, id: &VariationId) -> Option<ProductVariation> {
        self.variations.write().await.remove(id)
    }
}

#[async_trait::async_trait]
impl CatalogPort for InMemoryCatalog {
    async fn find_variation(
        &self,
        id: &VariationId,
    ) -> Result<Option<ProductVariation>, ApplicationError> {
        Ok(self.variations.read().await.get(id).cloned())
    }

    async fn find_variations(
        &self,
        ids: &[VariationId],
    ) -> Result<Vec<ProductVariation>, ApplicationError> {
        let variations = self.variations.read().await;
        Ok(ids.iter().filter_map(|id| variations.get(id).cloned()).collect())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: RwLock<HashMap<CartKey, Cart>>,
}

#[async_trait::async_trait]
impl CartPort for InMemoryCartRepository {
    async fn find_cart(&self, key: &CartKey) -> Result<Option<Cart>, ApplicationError> {
        Ok(self.carts.read().await.get(key).cloned())
    }

    async fn create_cart(
        &self,
        key: &CartKey,
        user_id: Option<&UserId>,
    ) -> Result<Cart, ApplicationError> {
        let mut carts = self.carts.write().await;
        let next_id = carts.len() + 1;
        let cart = carts.entry(key.clone()).or_insert_with(|| Cart {
            id: CartId(format!("cart-{next_id}")),
            key: key.clone(),
            user_id: user_id.cloned(),
            items: Vec::new(),
            created_at: Utc::now(),
        });
        Ok(cart.clone())
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        line_item: CartLineItem,
    ) -> Result<(), ApplicationError> {
        let mut carts = self.carts.write().await;
        let cart = carts.values_mut().find(|cart| &cart.id == cart_id).ok_or_else(|| {
            ApplicationError::Persistence(format!("cart `{}` does not exist", cart_id.0))
        })?;
        cart.items.push(line_item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use cobuy_core::domain::cart::{CartId, CartKey, CartLineItem, CartType, SessionId, StoreId};
    use cobuy_core::domain::order::{LineItem, Order, OrderId, OrderState};
    use cobuy_core::domain::price::Price;
    use cobuy_core::domain::product::{Product, ProductId, ProductVariation, VariationId};
    use cobuy_core::errors::ApplicationError;
    use cobuy_core::ports::{CartPort, CatalogPort, OrderHistoryPort};

    use super::{InMemoryCartRepository, InMemoryCatalog, InMemoryOrderHistory};

    fn order(id: &str, state: OrderState, day: u32) -> Order {
        Order {
            id: OrderId(id.to_string()),
            state,
            items: vec![LineItem::new(VariationId(1), 1)],
            placed_at: Utc.with_ymd_and_hms(2026, 1, day, 9, 0, 0).single().expect("timestamp"),
        }
    }

    #[tokio::test]
    async fn in_memory_history_returns_completed_orders_oldest_first() {
        let history = InMemoryOrderHistory::with_orders(vec![
            order("ord-3", OrderState::Completed, 6),
            order("ord-2", OrderState::Canceled, 5),
        ]);
        history.record(order("ord-1", OrderState::Completed, 4)).await;

        let orders = history.completed_orders().await.expect("orders");
        assert_eq!(
            orders.iter().map(|order| order.id.0.as_str()).collect::<Vec<_>>(),
            vec!["ord-1", "ord-3"]
        );
    }

    #[tokio::test]
    async fn in_memory_catalog_resolves_known_ids_only() {
        let catalog = InMemoryCatalog::default();
        catalog
            .save_product(Product { id: ProductId(1), title: "Tent".to_string(), image_url: None })
            .await;
        catalog
            .save_variation(ProductVariation {
                id: VariationId(10),
                product_id: ProductId(1),
                sku: "TENT-2P".to_string(),
                price: Price::new(Decimal::new(24900, 2), "USD"),
            })
            .await;

        let found = catalog.find_variations(&[VariationId(10), VariationId(11)]).await;
        assert_eq!(found.expect("variations").len(), 1);
        assert_eq!(catalog.find_products(&[ProductId(1)]).await.expect("products").len(), 1);

        assert!(catalog.remove_variation(&VariationId(10)).await.is_some());
        assert_eq!(catalog.find_variation(&VariationId(10)).await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn in_memory_carts_are_unique_per_key() {
        let carts = InMemoryCartRepository::default();
        let key = CartKey {
            session_id: SessionId("sess".to_string()),
            store_id: StoreId("default".to_string()),
            cart_type: CartType::Default,
        };

        let first = carts.create_cart(&key, None).await.expect("create");
        let second = carts.create_cart(&key, None).await.expect("create again");
        assert_eq!(first.id, second.id);

        let line = CartLineItem {
            variation_id: VariationId(10),
            quantity: 1,
            unit_price: Price::new(Decimal::new(24900, 2), "USD"),
        };
        carts.add_line_item(&first.id, line.clone()).await.expect("append");
        let stored = carts.find_cart(&key).await.expect("find").expect("cart");
        assert_eq!(stored.items, vec![line.clone()]);

        let error = carts
            .add_line_item(&CartId("cart-404".to_string()), line)
            .await
            .expect_err("unknown cart");
        assert!(matches!(error, ApplicationError::Persistence(_)));
    }
}
