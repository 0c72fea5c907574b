use std::collections::HashMap;

use crate::domain::product::{Product, ProductId, ProductVariation, VariationId};

/// Read-only snapshot of the catalog entities needed for one recommendation pass.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: HashMap<ProductId, Product>,
    variations: HashMap<VariationId, ProductVariation>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, variations: Vec<ProductVariation>) -> Self {
        Self {
            products: products.into_iter().map(|product| (product.id, product)).collect(),
            variations: variations.into_iter().map(|variation| (variation.id, variation)).collect(),
        }
    }

    pub fn variation(&self, id: &VariationId) -> Option<&ProductVariation> {
        self.variations.get(id)
    }

    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Parent product of a variation, when both are present in the snapshot.
    pub fn parent_of(&self, variation: &ProductVariation) -> Option<&Product> {
        self.product(&variation.product_id)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Catalog;
    use crate::domain::price::Price;
    use crate::domain::product::{Product, ProductId, ProductVariation, VariationId};

    #[test]
    fn resolves_variations_and_their_parent_products() {
        let catalog = Catalog::new(
            vec![Product { id: ProductId(1), title: "Kettle".to_string(), image_url: None }],
            vec![
                ProductVariation {
                    id: VariationId(10),
                    product_id: ProductId(1),
                    sku: "KET-RED".to_string(),
                    price: Price::new(Decimal::new(2999, 2), "USD"),
                },
                ProductVariation {
                    id: VariationId(11),
                    product_id: ProductId(2),
                    sku: "ORPHAN".to_string(),
                    price: Price::new(Decimal::new(100, 2), "USD"),
                },
            ],
        );

        let kettle = catalog.variation(&VariationId(10)).expect("variation 10");
        assert_eq!(catalog.parent_of(kettle).map(|p| p.title.as_str()), Some("Kettle"));

        let orphan = catalog.variation(&VariationId(11)).expect("variation 11");
        assert!(catalog.parent_of(orphan).is_none());
        assert!(catalog.variation(&VariationId(99)).is_none());
    }
}
