use std::collections::BTreeSet;

use tracing::info;

use crate::cart_action::{self, AddToCartOutcome, Selection};
use crate::catalog::Catalog;
use crate::cooccurrence::{SetAggregator, SetCount};
use crate::domain::cart::ShopperContext;
use crate::domain::order::Order;
use crate::domain::product::ProductId;
use crate::errors::{ApplicationError, CartError, DomainError};
use crate::ports::{CartPort, CatalogPort, OrderHistoryPort};
use crate::recommendation::{CurrencyFormatter, RecommendationBuilder, RecommendationView};

/// Most frequent set together with the catalog snapshot it was resolved against.
#[derive(Clone, Debug)]
pub struct ResolvedSet {
    pub set_count: SetCount,
    pub catalog: Catalog,
}

/// Request-scoped entry point: every call rescans the completed order history.
pub struct BuyTogetherService<H, K, C, A, F> {
    history: H,
    catalog: K,
    carts: C,
    aggregator: A,
    builder: RecommendationBuilder<F>,
}

impl<H, K, C, A, F> BuyTogetherService<H, K, C, A, F>
where
    H: OrderHistoryPort,
    K: CatalogPort,
    C: CartPort,
    A: SetAggregator,
    F: CurrencyFormatter,
{
    pub fn new(
        history: H,
        catalog: K,
        carts: C,
        aggregator: A,
        builder: RecommendationBuilder<F>,
    ) -> Self {
        Self { history, catalog, carts, aggregator, builder }
    }

    pub async fn most_frequent_set(&self) -> Result<Option<ResolvedSet>, ApplicationError> {
        let orders = self.history.completed_orders().await?;
        if orders.is_empty() {
            return Ok(None);
        }

        let catalog = self.catalog_snapshot(&orders).await?;
        let set_count = self.aggregator.most_frequent_set(&orders, &catalog);
        info!(
            event_name = "buy_together.aggregate.completed",
            orders_scanned = orders.len(),
            signature = set_count.as_ref().map(|set| set.signature.as_str()).unwrap_or("none"),
            count = set_count.as_ref().map(|set| set.count).unwrap_or(0),
            "co-occurrence scan finished"
        );

        Ok(set_count.map(|set_count| ResolvedSet { set_count, catalog }))
    }

    /// `Ok(None)` is the neutral "nothing to show" state.
    pub async fn recommend(&self) -> Result<Option<RecommendationView>, ApplicationError> {
        let Some(resolved) = self.most_frequent_set().await? else {
            return Ok(None);
        };

        Ok(Some(self.build_view(&resolved)?))
    }

    /// Projects an already resolved set through the configured builder.
    pub fn build_view(&self, resolved: &ResolvedSet) -> Result<RecommendationView, DomainError> {
        self.builder.build(&resolved.set_count, &resolved.catalog)
    }

    pub async fn add_selected_to_cart(
        &self,
        selection: &Selection,
        context: &ShopperContext,
    ) -> Result<AddToCartOutcome, CartError> {
        cart_action::add_selected_to_cart(&self.catalog, &self.carts, selection, context).await
    }

    pub fn carts(&self) -> &C {
        &self.carts
    }

    async fn catalog_snapshot(&self, orders: &[Order]) -> Result<Catalog, ApplicationError> {
        let variation_ids = orders
            .iter()
            .filter(|order| order.is_completed())
            .flat_map(|order| order.items.iter().filter_map(|item| item.purchased_entity))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let variations = self.catalog.find_variations(&variation_ids).await?;

        let product_ids = variations
            .iter()
            .map(|variation| variation.product_id)
            .collect::<BTreeSet<ProductId>>()
            .into_iter()
            .collect::<Vec<_>>();
        let products = self.catalog.find_products(&product_ids).await?;

        Ok(Catalog::new(products, variations))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::BuyTogetherService;
    use crate::cart_action::parse_selection;
    use crate::cart_action::tests::{shopper, FakeCarts, FakeCatalog};
    use crate::cooccurrence::ExactMatchAggregator;
    use crate::domain::order::{LineItem, Order, OrderId, OrderState};
    use crate::domain::product::VariationId;
    use crate::errors::{ApplicationError, DomainError};
    use crate::ports::OrderHistoryPort;
    use crate::recommendation::{RecommendationBuilder, SymbolCurrencyFormatter};

    struct FixedHistory(Vec<Order>);

    #[async_trait]
    impl OrderHistoryPort for FixedHistory {
        async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl OrderHistoryPort for BrokenHistory {
        async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError> {
            Err(ApplicationError::Persistence("order table locked".to_string()))
        }
    }

    fn completed(id: &str, variation_ids: &[i64]) -> Order {
        Order {
            id: OrderId(id.to_string()),
            state: OrderState::Completed,
            items: variation_ids.iter().map(|v| LineItem::new(VariationId(*v), 1)).collect(),
            placed_at: Utc::now(),
        }
    }

    fn service<H: OrderHistoryPort>(
        history: H,
        catalog: FakeCatalog,
    ) -> BuyTogetherService<H, FakeCatalog, FakeCarts, ExactMatchAggregator, SymbolCurrencyFormatter>
    {
        BuyTogetherService::new(
            history,
            catalog,
            FakeCarts::default(),
            ExactMatchAggregator,
            RecommendationBuilder::new(SymbolCurrencyFormatter, "USD"),
        )
    }

    #[tokio::test]
    async fn recommends_the_most_frequent_set_and_links_to_add_to_cart() {
        let history = FixedHistory(vec![
            completed("O1", &[1, 2, 3]),
            completed("O2", &[3, 1, 2]),
            completed("O3", &[1, 2, 3, 4]),
        ]);
        let service = service(history, FakeCatalog::with_variations(&[1, 2, 3, 4]));

        let view = service.recommend().await.expect("recommend").expect("view");

        assert_eq!(view.products.len(), 3);
        assert_eq!(view.total_price, "$30.00");
        assert_eq!(view.add_to_cart_url.as_deref(), Some("/buy-together/add/1,2,3"));
    }

    #[tokio::test]
    async fn no_eligible_history_is_not_an_error() {
        let history = FixedHistory(vec![completed("O1", &[1, 2]), completed("O2", &[3])]);
        let service = service(history, FakeCatalog::with_variations(&[1, 2, 3]));

        assert_eq!(service.recommend().await.expect("recommend"), None);
    }

    #[tokio::test]
    async fn empty_history_is_not_an_error() {
        let service = service(FixedHistory(Vec::new()), FakeCatalog::default());
        assert!(service.most_frequent_set().await.expect("scan").is_none());
    }

    #[tokio::test]
    async fn history_failures_propagate() {
        let service = service(BrokenHistory, FakeCatalog::default());

        let error = service.recommend().await.expect_err("history offline");
        assert!(matches!(error, ApplicationError::Persistence(_)));
    }

    #[tokio::test]
    async fn build_view_uses_the_injected_currency() {
        let history = FixedHistory(vec![completed("O1", &[1, 2, 3]), completed("O2", &[2, 3, 1])]);
        let service = BuyTogetherService::new(
            history,
            FakeCatalog::with_variations(&[1, 2, 3]),
            FakeCarts::default(),
            ExactMatchAggregator,
            RecommendationBuilder::new(SymbolCurrencyFormatter, "EUR"),
        );

        let resolved = service.most_frequent_set().await.expect("scan").expect("winner");
        assert_eq!(resolved.set_count.count, 2);

        // USD prices cannot be summed into the EUR zero total.
        let error = service.build_view(&resolved).expect_err("currency mismatch");
        assert!(matches!(
            error,
            DomainError::CurrencyMismatch { ref expected, .. } if expected == "EUR"
        ));
        assert!(matches!(
            service.recommend().await,
            Err(ApplicationError::Domain(DomainError::CurrencyMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn recommended_link_round_trips_into_the_cart() {
        let history = FixedHistory(vec![completed("O1", &[7, 8, 9]), completed("O2", &[9, 8, 7])]);
        let service = service(history, FakeCatalog::with_variations(&[7, 8, 9]));

        let view = service.recommend().await.expect("recommend").expect("view");
        let url = view.add_to_cart_url.expect("action link");
        let raw_ids = url.rsplit('/').next().expect("ids segment");

        let outcome = service
            .add_selected_to_cart(&parse_selection(raw_ids), &shopper("s-1"))
            .await
            .expect("cart available");

        assert_eq!(outcome.added, vec![VariationId(7), VariationId(8), VariationId(9)]);
        assert_eq!(service.carts().items().len(), 3);
    }
}
