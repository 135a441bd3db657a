//! Price breakdown for an explicit set of meals or the current cart.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{cart, float_or};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::schedule::resolve_date;

const PRICE_BREAKDOWN_QUERY: &str = r#"
query GetPriceBreakdown($date: String!, $items: [OrderItemInput!]!) {
  priceBreakdown(date: $date, items: $items) {
    subtotal
    deliveryFee
    serviceFee
    taxes
    discounts
    credits
    total
  }
}"#;

/// One meal to price: the meal entity, a positive quantity, and the inventory
/// line it would be fulfilled from.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ItemInput {
    pub entity_id: i64,
    pub quantity: u32,
    pub inventory_id: String,
}

impl From<cart::CartItem> for ItemInput {
    fn from(item: cart::CartItem) -> Self {
        Self {
            entity_id: item.entity_id,
            // Cart quantities arrive as i64; clamp into the input's range.
            quantity: u32::try_from(item.quantity.max(0)).unwrap_or(u32::MAX),
            inventory_id: item.inventory_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceBreakdown {
    pub date: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub taxes: f64,
    pub discounts: f64,
    pub credits: f64,
    pub total: f64,
}

pub(crate) fn items_variable(items: &[ItemInput]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| {
                json!({
                    "entityId": item.entity_id,
                    "qty": item.quantity,
                    "inventoryId": item.inventory_id,
                })
            })
            .collect(),
    )
}

/// Compute the cost summary for `items`, or for the current cart contents
/// when no explicit items are given. With neither, this is a precondition
/// failure raised before the pricing call.
pub async fn price_breakdown(
    gateway: &Gateway,
    date: Option<&str>,
    items: Option<Vec<ItemInput>>,
) -> Result<PriceBreakdown, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let items = match items.filter(|items| !items.is_empty()) {
        Some(items) => items,
        None => cart::fetch_cart(gateway, &date)
            .await?
            .into_iter()
            .map(ItemInput::from)
            .collect(),
    };
    if items.is_empty() {
        return Err(GatewayError::Precondition(format!(
            "nothing to price: pass meals explicitly or add items to the cart for {date}"
        )));
    }

    let data = gateway
        .execute(
            Service::Subscription,
            PRICE_BREAKDOWN_QUERY,
            "GetPriceBreakdown",
            json!({"date": date, "items": items_variable(&items)}),
        )
        .await?;
    let node = data.get("priceBreakdown").cloned().unwrap_or(Value::Null);
    Ok(PriceBreakdown {
        date,
        subtotal: float_or(&node, "subtotal", 0.0),
        delivery_fee: float_or(&node, "deliveryFee", 0.0),
        service_fee: float_or(&node, "serviceFee", 0.0),
        taxes: float_or(&node, "taxes", 0.0),
        discounts: float_or(&node, "discounts", 0.0),
        credits: float_or(&node, "credits", 0.0),
        total: float_or(&node, "total", 0.0),
    })
}
