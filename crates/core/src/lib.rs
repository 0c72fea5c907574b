pub mod cart_action;
pub mod catalog;
pub mod config;
pub mod cooccurrence;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod recommendation;
pub mod service;

pub use cart_action::{add_selected_to_cart, parse_selection, AddToCartOutcome, Selection};
pub use catalog::Catalog;
pub use cooccurrence::{
    find_most_frequent_set, ExactMatchAggregator, ProductSetSignature, SetAggregator, SetCount,
};
pub use domain::cart::{Cart, CartId, CartKey, CartLineItem, CartType, ShopperContext};
pub use domain::order::{LineItem, Order, OrderId, OrderState};
pub use domain::price::Price;
pub use domain::product::{Product, ProductId, ProductVariation, VariationId};
pub use errors::{ApplicationError, CartError, DomainError, InterfaceError};
pub use ports::{CartPort, CatalogPort, OrderHistoryPort};
pub use recommendation::{
    CurrencyFormatter, ProductView, RecommendationBuilder, RecommendationView,
    SymbolCurrencyFormatter,
};
pub use service::{BuyTogetherService, ResolvedSet};
