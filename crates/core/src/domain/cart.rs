use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::price::Price;
use crate::domain::product::VariationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartType {
    Default,
}

impl CartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
        }
    }
}

/// The caller's session, store and (optional) authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopperContext {
    pub session_id: SessionId,
    pub store_id: StoreId,
    pub user_id: Option<UserId>,
}

/// Identity of a cart: at most one cart exists per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKey {
    pub session_id: SessionId,
    pub store_id: StoreId,
    pub cart_type: CartType,
}

impl CartKey {
    pub fn for_shopper(context: &ShopperContext, cart_type: CartType) -> Self {
        Self {
            session_id: context.session_id.clone(),
            store_id: context.store_id.clone(),
            cart_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub variation_id: VariationId,
    pub quantity: u32,
    pub unit_price: Price,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub key: CartKey,
    pub user_id: Option<UserId>,
    pub items: Vec<CartLineItem>,
    pub created_at: DateTime<Utc>,
}
