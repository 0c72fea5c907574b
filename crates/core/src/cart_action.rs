//! Bulk add-to-cart for a confirmed recommendation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cart::{CartId, CartKey, CartLineItem, CartType, ShopperContext};
use crate::domain::product::VariationId;
use crate::errors::CartError;
use crate::ports::{CartPort, CatalogPort};

const SELECTION_DELIMITER: char = ',';

/// Identifiers parsed from a delimited selection, plus the tokens that were not identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<VariationId>,
    pub rejected: Vec<String>,
}

pub fn parse_selection(raw: &str) -> Selection {
    let mut selection = Selection::default();

    for token in raw.split(SELECTION_DELIMITER) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<VariationId>() {
            Ok(id) => selection.ids.push(id),
            Err(_) => selection.rejected.push(token.to_string()),
        }
    }

    selection
}

/// What an add-to-cart pass did. `skipped` holds every requested token that produced no
/// line item, in request order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartOutcome {
    pub cart_id: CartId,
    pub cart_created: bool,
    pub added: Vec<VariationId>,
    pub skipped: Vec<String>,
}

impl AddToCartOutcome {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Appends one quantity-1 line item per resolvable identifier to the shopper's default cart,
/// creating the cart first when none exists. Duplicates are not merged.
pub async fn add_selected_to_cart<K, C>(
    catalog: &K,
    carts: &C,
    selection: &Selection,
    context: &ShopperContext,
) -> Result<AddToCartOutcome, CartError>
where
    K: CatalogPort + ?Sized,
    C: CartPort + ?Sized,
{
    let key = CartKey::for_shopper(context, CartType::Default);
    let (cart_id, cart_created) = resolve_cart(carts, &key, context).await?;

    let mut added = Vec::new();
    let mut skipped = selection.rejected.clone();

    for id in &selection.ids {
        let variation = match catalog.find_variation(id).await {
            Ok(Some(variation)) => variation,
            Ok(None) => {
                debug!(
                    event_name = "cart_action.variation.unresolved",
                    variation_id = %id,
                    "skipping unknown product variation"
                );
                skipped.push(id.to_string());
                continue;
            }
            Err(error) => {
                warn!(
                    event_name = "cart_action.variation.lookup_failed",
                    variation_id = %id,
                    error = %error,
                    "skipping product variation after catalog failure"
                );
                skipped.push(id.to_string());
                continue;
            }
        };

        let line_item =
            CartLineItem { variation_id: variation.id, quantity: 1, unit_price: variation.price };
        if let Err(error) = carts.add_line_item(&cart_id, line_item).await {
            warn!(
                event_name = "cart_action.line_item.append_failed",
                cart_id = %cart_id.0,
                variation_id = %id,
                error = %error,
                "failed to append line item"
            );
            skipped.push(id.to_string());
            continue;
        }
        added.push(*id);
    }

    info!(
        event_name = "cart_action.completed",
        cart_id = %cart_id.0,
        session_id = %context.session_id.0,
        added = added.len(),
        skipped = skipped.len(),
        "bulk add-to-cart finished"
    );

    Ok(AddToCartOutcome { cart_id, cart_created, added, skipped })
}

async fn resolve_cart<C>(
    carts: &C,
    key: &CartKey,
    context: &ShopperContext,
) -> Result<(CartId, bool), CartError>
where
    C: CartPort + ?Sized,
{
    let existing =
        carts.find_cart(key).await.map_err(|error| CartError::Unavailable(error.to_string()))?;
    if let Some(cart) = existing {
        return Ok((cart.id, false));
    }

    let cart = carts
        .create_cart(key, context.user_id.as_ref())
        .await
        .map_err(|error| CartError::Unavailable(error.to_string()))?;
    info!(
        event_name = "cart_action.cart.created",
        cart_id = %cart.id.0,
        store_id = %key.store_id.0,
        cart_type = key.cart_type.as_str(),
        "created cart for shopper session"
    );

    Ok((cart.id, true))
}
