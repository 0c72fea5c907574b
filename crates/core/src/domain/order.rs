use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::VariationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,
    Placed,
    Validation,
    Fulfillment,
    Completed,
    Canceled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Placed => "placed",
            Self::Validation => "validation",
            Self::Fulfillment => "fulfillment",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "placed" => Some(Self::Placed),
            "validation" => Some(Self::Validation),
            "fulfillment" => Some(Self::Fulfillment),
            "completed" => Some(Self::Completed),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// One purchased-entity reference within an order. The reference is optional because the
/// purchased variation may have been deleted after the order was placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub purchased_entity: Option<VariationId>,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(purchased_entity: VariationId, quantity: u32) -> Self {
        Self { purchased_entity: Some(purchased_entity), quantity }
    }

    pub fn orphaned(quantity: u32) -> Self {
        Self { purchased_entity: None, quantity }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub state: OrderState,
    pub items: Vec<LineItem>,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    pub fn is_completed(&self) -> bool {
        self.state == OrderState::Completed
    }
}
