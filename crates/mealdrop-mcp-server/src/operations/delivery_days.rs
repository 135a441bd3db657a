//! Upcoming delivery days with the derived status and aggregated counts.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, int_or, name_or_unknown, str_or_empty};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};

const UPCOMING_DAYS_QUERY: &str = r#"
query GetUpcomingDays {
  upcomingDays {
    date
    canEdit
    skip
    isPaused
    cart { items { name qty inventoryId } }
    recommendations { items { name qty } }
    order { id items { qty } }
  }
}"#;

/// Derived delivery-day state. The raw booleans are not mutually exclusive
/// upstream; the precedence here is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Locked,
    Active,
    Skipped,
    Paused,
}

impl DayStatus {
    /// Precedence: not editable wins over everything, then skipped, then
    /// paused, then active.
    pub fn derive(can_edit: bool, skip: bool, is_paused: bool) -> Self {
        if !can_edit {
            DayStatus::Locked
        } else if skip {
            DayStatus::Skipped
        } else if is_paused {
            DayStatus::Paused
        } else {
            DayStatus::Active
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayItem {
    pub name: String,
    pub quantity: i64,
    pub inventory_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayOrder {
    pub id: String,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryDay {
    pub date: String,
    pub status: DayStatus,
    /// Sum of cart line quantities, missing quantities as 0.
    pub cart_count: i64,
    /// Sum of recommendation line quantities, missing quantities as 1.
    pub recommendation_count: i64,
    pub cart_items: Vec<DayItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<DayOrder>,
}

pub(crate) fn normalize_day(node: &Value) -> DeliveryDay {
    let flag = |key: &str, default: bool| node.get(key).and_then(Value::as_bool).unwrap_or(default);
    let cart = node.get("cart").cloned().unwrap_or(Value::Null);
    let recommendations = node.get("recommendations").cloned().unwrap_or(Value::Null);

    let cart_items: Vec<DayItem> = array(&cart, "items")
        .iter()
        .map(|line| DayItem {
            name: name_or_unknown(line, "name"),
            quantity: int_or(line, "qty", 0),
            inventory_id: str_or_empty(line, "inventoryId"),
        })
        .collect();

    DeliveryDay {
        date: str_or_empty(node, "date"),
        status: DayStatus::derive(
            flag("canEdit", true),
            flag("skip", false),
            flag("isPaused", false),
        ),
        cart_count: cart_items.iter().map(|line| line.quantity).sum(),
        recommendation_count: array(&recommendations, "items")
            .iter()
            .map(|line| int_or(line, "qty", 1))
            .sum(),
        cart_items,
        order: node
            .get("order")
            .filter(|order| !order.is_null())
            .map(|order| DayOrder {
                id: str_or_empty(order, "id"),
                item_count: array(order, "items")
                    .iter()
                    .map(|line| int_or(line, "qty", 0))
                    .sum(),
            }),
    }
}

pub async fn upcoming_days(gateway: &Gateway) -> Result<Vec<DeliveryDay>, GatewayError> {
    let data = gateway
        .execute(
            Service::Subscription,
            UPCOMING_DAYS_QUERY,
            "GetUpcomingDays",
            json!({}),
        )
        .await?;
    Ok(array(&data, "upcomingDays").iter().map(normalize_day).collect())
}
