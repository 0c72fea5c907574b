//! Collaborator contracts injected into [`crate::service::BuyTogetherService`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::cart::{Cart, CartId, CartKey, CartLineItem, UserId};
use crate::domain::order::Order;
use crate::domain::product::{Product, ProductId, ProductVariation, VariationId};
use crate::errors::ApplicationError;

#[async_trait]
pub trait OrderHistoryPort: Send + Sync {
    /// Every order in the `completed` state, in a stable scan order.
    async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError>;
}

#[async_trait]
pub trait CatalogPort: Send + Sync {
    async fn find_variation(
        &self,
        id: &VariationId,
    ) -> Result<Option<ProductVariation>, ApplicationError>;

    /// Resolves the subset of `ids` that exist. Unknown ids are silently absent.
    async fn find_variations(
        &self,
        ids: &[VariationId],
    ) -> Result<Vec<ProductVariation>, ApplicationError>;

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError>;
}

#[async_trait]
pub trait CartPort: Send + Sync {
    async fn find_cart(&self, key: &CartKey) -> Result<Option<Cart>, ApplicationError>;

    async fn create_cart(
        &self,
        key: &CartKey,
        user_id: Option<&UserId>,
    ) -> Result<Cart, ApplicationError>;

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        line_item: CartLineItem,
    ) -> Result<(), ApplicationError>;
}

#[async_trait]
impl<T> OrderHistoryPort for Arc<T>
where
    T: OrderHistoryPort + ?Sized,
{
    async fn completed_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        (**self).completed_orders().await
    }
}

#[async_trait]
impl<T> CatalogPort for Arc<T>
where
    T: CatalogPort + ?Sized,
{
    async fn find_variation(
        &self,
        id: &VariationId,
    ) -> Result<Option<ProductVariation>, ApplicationError> {
        (**self).find_variation(id).await
    }

    async fn find_variations(
        &self,
        ids: &[VariationId],
    ) -> Result<Vec<ProductVariation>, ApplicationError> {
        (**self).find_variations(ids).await
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        (**self).find_products(ids).await
    }
}

#[async_trait]
impl<T> CartPort for Arc<T>
where
    T: CartPort + ?Sized,
{
    async fn find_cart(&self, key: &CartKey) -> Result<Option<Cart>, ApplicationError> {
        (**self).find_cart(key).await
    }

    async fn create_cart(
        &self,
        key: &CartKey,
        user_id: Option<&UserId>,
    ) -> Result<Cart, ApplicationError> {
        (**self).create_cart(key, user_id).await
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        line_item: CartLineItem,
    ) -> Result<(), ApplicationError> {
        (**self).add_line_item(cart_id, line_item).await
    }
}
