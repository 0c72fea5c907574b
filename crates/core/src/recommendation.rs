use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::cooccurrence::SetCount;
use crate::domain::price::Price;
use crate::domain::product::VariationId;
use crate::errors::DomainError;

/// Upper bound on products shown in the block and added by its action link.
pub const MAX_DISPLAYED_PRODUCTS: usize = 3;

pub const ADD_TO_CART_ROUTE: &str = "/buy-together/add";

pub trait CurrencyFormatter: Send + Sync {
    fn format(&self, number: Decimal, currency_code: &str) -> String;
}

/// Two-decimal formatting with a leading symbol for well-known currencies and a trailing
/// ISO code otherwise.
#[derive(Default)]
pub struct SymbolCurrencyFormatter;

impl CurrencyFormatter for SymbolCurrencyFormatter {
    fn format(&self, number: Decimal, currency_code: &str) -> String {
        let rounded = number.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        let mut magnitude = rounded.abs();
        magnitude.rescale(2);

        match currency_symbol(currency_code) {
            Some(symbol) => format!("{sign}{symbol}{magnitude}"),
            None => format!("{sign}{magnitude} {}", currency_code.to_ascii_uppercase()),
        }
    }
}

fn currency_symbol(currency_code: &str) -> Option<&'static str> {
    match currency_code.to_ascii_uppercase().as_str() {
        "USD" | "CAD" | "AUD" | "NZD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        "INR" => Some("₹"),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub url: String,
    pub image: String,
    pub price: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationView {
    pub products: Vec<ProductView>,
    pub total_price: String,
    pub add_to_cart_url: Option<String>,
    #[serde(skip)]
    pub product_ids: Vec<VariationId>,
}

pub struct RecommendationBuilder<F> {
    formatter: F,
    default_currency: String,
}

impl<F> RecommendationBuilder<F>
where
    F: CurrencyFormatter,
{
    pub fn new(formatter: F, default_currency: impl Into<String>) -> Self {
        Self { formatter, default_currency: default_currency.into() }
    }

    /// Projects the winning set onto at most [`MAX_DISPLAYED_PRODUCTS`] entries.
    ///
    /// Representatives are truncated, never reordered. A variation whose parent product is
    /// missing from the catalog is left out of the view, the total and the action link.
    pub fn build(
        &self,
        set_count: &SetCount,
        catalog: &Catalog,
    ) -> Result<RecommendationView, DomainError> {
        let mut products = Vec::new();
        let mut product_ids = Vec::new();
        let mut total = Price::zero(self.default_currency.clone());

        for variation in set_count.products.iter().take(MAX_DISPLAYED_PRODUCTS) {
            let Some(product) = catalog.parent_of(variation) else {
                tracing::debug!(
                    event_name = "recommendation.product.unresolved",
                    variation_id = %variation.id,
                    product_id = %variation.product_id,
                    "skipping variation without a parent product"
                );
                continue;
            };

            total = total.checked_add(&variation.price)?;
            product_ids.push(variation.id);
            products.push(ProductView {
                url: product.canonical_url(),
                image: product.image_url.clone().unwrap_or_default(),
                price: self
                    .formatter
                    .format(variation.price.number, &variation.price.currency_code),
                title: product.title.clone(),
            });
        }

        Ok(RecommendationView {
            products,
            total_price: self.formatter.format(total.number, &total.currency_code),
            add_to_cart_url: add_to_cart_path(&product_ids),
            product_ids,
        })
    }
}

/// Action link for a selection, absent for an empty selection.
pub fn add_to_cart_path(product_ids: &[VariationId]) -> Option<String> {
    if product_ids.is_empty() {
        return None;
    }

    let joined = product_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    Some(format!("{ADD_TO_CART_ROUTE}/{joined}"))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        add_to_cart_path, CurrencyFormatter, RecommendationBuilder, SymbolCurrencyFormatter,
        MAX_DISPLAYED_PRODUCTS,
    };
    use crate::catalog::Catalog;
    use crate::cooccurrence::{ProductSetSignature, SetCount};
    use crate::domain::price::Price;
    use crate::domain::product::{Product, ProductId, ProductVariation, VariationId};
    use crate::errors::DomainError;

    fn variation(id: i64, cents: i64, currency: &str) -> ProductVariation {
        ProductVariation {
            id: VariationId(id),
            product_id: ProductId(id * 10),
            sku: format!("SKU-{id}"),
            price: Price::new(Decimal::new(cents, 2), currency),
        }
    }

    fn product(id: i64, image_url: Option<&str>) -> Product {
        Product {
            id: ProductId(id * 10),
            title: format!("Product {id}"),
            image_url: image_url.map(str::to_string),
        }
    }

    fn set_count(products: Vec<ProductVariation>) -> SetCount {
        SetCount {
            signature: ProductSetSignature::from_ids(products.iter().map(|p| &p.id)),
            products,
            count: 2,
        }
    }

    fn builder() -> RecommendationBuilder<SymbolCurrencyFormatter> {
        RecommendationBuilder::new(SymbolCurrencyFormatter, "USD")
    }

    #[test]
    fn caps_view_at_three_products_in_representative_order() {
        let variations = vec![
            variation(4, 1000, "USD"),
            variation(1, 1000, "USD"),
            variation(3, 1000, "USD"),
            variation(2, 1000, "USD"),
            variation(5, 1000, "USD"),
        ];
        let catalog = Catalog::new((1..=5).map(|id| product(id, None)).collect(), variations.clone());

        let view = builder().build(&set_count(variations), &catalog).expect("view");

        assert_eq!(view.products.len(), MAX_DISPLAYED_PRODUCTS);
        assert_eq!(view.product_ids, vec![VariationId(4), VariationId(1), VariationId(3)]);
        assert_eq!(view.add_to_cart_url.as_deref(), Some("/buy-together/add/4,1,3"));
        assert_eq!(view.total_price, "$30.00");
    }

    #[test]
    fn renders_urls_titles_images_and_unit_prices() {
        let variations =
            vec![variation(1, 1999, "USD"), variation(2, 500, "USD"), variation(3, 1, "USD")];
        let catalog = Catalog::new(
            vec![
                product(1, Some("https://cdn.example.com/kettle.jpg")),
                product(2, None),
                product(3, None),
            ],
            variations.clone(),
        );

        let view = builder().build(&set_count(variations), &catalog).expect("view");

        assert_eq!(view.products[0].url, "/product/10");
        assert_eq!(view.products[0].title, "Product 1");
        assert_eq!(view.products[0].image, "https://cdn.example.com/kettle.jpg");
        assert_eq!(view.products[0].price, "$19.99");
        assert_eq!(view.products[1].image, "", "missing image renders empty");
        assert_eq!(view.products[2].price, "$0.01");
        assert_eq!(view.total_price, "$25.00");
    }

    #[test]
    fn variations_without_parent_product_are_left_out() {
        let variations =
            vec![variation(1, 1000, "USD"), variation(2, 1000, "USD"), variation(3, 1000, "USD")];
        let catalog = Catalog::new(vec![product(1, None), product(3, None)], variations.clone());

        let view = builder().build(&set_count(variations), &catalog).expect("view");

        assert_eq!(view.products.len(), 2);
        assert_eq!(view.add_to_cart_url.as_deref(), Some("/buy-together/add/1,3"));
        assert_eq!(view.total_price, "$20.00");
    }

    #[test]
    fn empty_projection_has_no_action_link() {
        let variations =
            vec![variation(1, 1000, "USD"), variation(2, 1000, "USD"), variation(3, 1000, "USD")];
        let catalog = Catalog::new(Vec::new(), variations.clone());

        let view = builder().build(&set_count(variations), &catalog).expect("view");

        assert!(view.products.is_empty());
        assert_eq!(view.add_to_cart_url, None);
        assert_eq!(view.total_price, "$0.00");
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let variations =
            vec![variation(1, 1000, "USD"), variation(2, 1000, "EUR"), variation(3, 1000, "USD")];
        let catalog = Catalog::new((1..=3).map(|id| product(id, None)).collect(), variations.clone());

        let error = builder().build(&set_count(variations), &catalog).expect_err("mismatch");

        assert!(matches!(error, DomainError::CurrencyMismatch { ref found, .. } if found == "EUR"));
    }

    #[test]
    fn formatter_uses_symbols_or_iso_codes() {
        let formatter = SymbolCurrencyFormatter;

        assert_eq!(formatter.format(Decimal::new(123_456, 2), "usd"), "$1234.56");
        assert_eq!(formatter.format(Decimal::new(5, 1), "EUR"), "€0.50");
        assert_eq!(formatter.format(Decimal::new(-250, 2), "GBP"), "-£2.50");
        assert_eq!(formatter.format(Decimal::new(10_005, 3), "CHF"), "10.01 CHF");
    }

    #[test]
    fn add_to_cart_path_joins_ids_with_commas() {
        assert_eq!(
            add_to_cart_path(&[VariationId(5), VariationId(99), VariationId(5)]).as_deref(),
            Some("/buy-together/add/5,99,5")
        );
        assert_eq!(add_to_cart_path(&[]), None);
    }
}
