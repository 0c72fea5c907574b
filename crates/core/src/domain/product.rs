use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::price::Price;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

/// Purchasable entity referenced by order and cart line items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariationId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VariationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VariationId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<i64>().map(Self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub image_url: Option<String>,
}

impl Product {
    pub fn canonical_url(&self) -> String {
        format!("/product/{}", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariation {
    pub id: VariationId,
    pub product_id: ProductId,
    pub sku: String,
    pub price: Price,
}

#[cfg(test)]
mod tests {
    use super::{Product, ProductId, VariationId};

    #[test]
    fn variation_id_parses_trimmed_numeric_tokens() {
        assert_eq!(" 42 ".parse::<VariationId>(), Ok(VariationId(42)));
        assert!("abc".parse::<VariationId>().is_err());
        assert!("".parse::<VariationId>().is_err());
    }

    #[test]
    fn canonical_url_uses_product_id() {
        let product = Product { id: ProductId(7), title: "Tent".to_string(), image_url: None };
        assert_eq!(product.canonical_url(), "/product/7");
    }
}
