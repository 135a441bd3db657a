//! All-orders listing with the derived per-order item count.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, float_or, int_or, name_or_unknown, str_or_empty};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::pagination::{Page, paginate};

const ORDERS_QUERY: &str = r#"
query GetAllOrders {
  orders {
    id
    date
    status
    total
    items { name qty inventoryId }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub name: String,
    pub quantity: i64,
    pub inventory_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub date: String,
    pub status: String,
    pub total: f64,
    /// Sum of per-line quantities; lines without a quantity count as 0.
    pub item_count: i64,
    pub items: Vec<OrderLine>,
}

pub(crate) fn normalize_order(node: &Value) -> Order {
    let items: Vec<OrderLine> = array(node, "items")
        .iter()
        .map(|line| OrderLine {
            name: name_or_unknown(line, "name"),
            quantity: int_or(line, "qty", 0),
            inventory_id: str_or_empty(line, "inventoryId"),
        })
        .collect();
    Order {
        id: str_or_empty(node, "id"),
        date: str_or_empty(node, "date"),
        status: str_or_empty(node, "status"),
        total: float_or(node, "total", 0.0),
        item_count: items.iter().map(|line| line.quantity).sum(),
        items,
    }
}

pub async fn list_orders(
    gateway: &Gateway,
    offset: usize,
    limit: usize,
) -> Result<Page<Order>, GatewayError> {
    let data = gateway
        .execute(Service::Subscription, ORDERS_QUERY, "GetAllOrders", json!({}))
        .await?;
    Ok(paginate(
        array(&data, "orders").iter().map(normalize_order).collect(),
        offset,
        limit,
    ))
}
