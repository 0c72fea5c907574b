//! Co-occurrence aggregation over completed order history.
//!
//! Every completed order that resolves to at least [`MIN_SET_SIZE`] distinct variations is
//! reduced to a [`ProductSetSignature`]. Orders that share a signature are counted together
//! and the most frequent signature wins. Ties go to the signature seen first in the scan.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::domain::order::Order;
use crate::domain::product::{ProductVariation, VariationId};

/// Orders resolving to fewer distinct variations never participate in counting.
pub const MIN_SET_SIZE: usize = 3;

const SIGNATURE_SEPARATOR: &str = "_";

/// Canonical, order-independent key of a purchased product set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductSetSignature(String);

impl ProductSetSignature {
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a VariationId>) -> Self {
        let mut sorted = ids.into_iter().copied().collect::<Vec<_>>();
        sorted.sort_unstable();
        sorted.dedup();

        let key = sorted.iter().map(ToString::to_string).collect::<Vec<_>>();
        Self(key.join(SIGNATURE_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductSetSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCount {
    pub signature: ProductSetSignature,
    /// Variations of the first order observed with this signature, in line-item order.
    pub products: Vec<ProductVariation>,
    pub count: u32,
}

pub trait SetAggregator: Send + Sync {
    fn most_frequent_set(&self, orders: &[Order], catalog: &Catalog) -> Option<SetCount>;
}

#[derive(Default)]
pub struct ExactMatchAggregator;

impl SetAggregator for ExactMatchAggregator {
    fn most_frequent_set(&self, orders: &[Order], catalog: &Catalog) -> Option<SetCount> {
        find_most_frequent_set(orders, catalog)
    }
}

pub fn find_most_frequent_set(orders: &[Order], catalog: &Catalog) -> Option<SetCount> {
    let counts = count_sets(orders, catalog);

    // Equal counts keep the signature seen first.
    counts.into_iter().fold(None, |best: Option<SetCount>, candidate| match best {
        Some(current) if current.count >= candidate.count => Some(current),
        _ => Some(candidate),
    })
}

/// Counts every eligible signature, in order of first appearance.
pub fn count_sets(orders: &[Order], catalog: &Catalog) -> Vec<SetCount> {
    let mut counts: Vec<SetCount> = Vec::new();
    let mut index_by_signature: HashMap<ProductSetSignature, usize> = HashMap::new();

    for order in orders.iter().filter(|order| order.is_completed()) {
        let Some(products) = eligible_products(order, catalog) else {
            continue;
        };

        let signature = ProductSetSignature::from_ids(products.iter().map(|product| &product.id));
        match index_by_signature.get(&signature) {
            Some(&index) => counts[index].count += 1,
            None => {
                index_by_signature.insert(signature.clone(), counts.len());
                counts.push(SetCount { signature, products, count: 1 });
            }
        }
    }

    counts
}

/// Resolves an order's line items to distinct variations, or `None` below the size floor.
fn eligible_products(order: &Order, catalog: &Catalog) -> Option<Vec<ProductVariation>> {
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(order.items.len());

    for item in &order.items {
        let Some(variation_id) = item.purchased_entity else {
            tracing::debug!(
                event_name = "cooccurrence.line_item.missing_entity",
                order_id = %order.id.0,
                "skipping line item without purchased entity"
            );
            continue;
        };
        let Some(variation) = catalog.variation(&variation_id) else {
            tracing::debug!(
                event_name = "cooccurrence.line_item.unresolved",
                order_id = %order.id.0,
                variation_id = %variation_id,
                "skipping line item with unresolvable purchased entity"
            );
            continue;
        };
        if seen.insert(variation_id) {
            products.push(variation.clone());
        }
    }

    (products.len() >= MIN_SET_SIZE).then_some(products)
}
