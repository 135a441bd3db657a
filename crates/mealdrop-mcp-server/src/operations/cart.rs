//! Cart mutations and the fresh cart fetch shared with checkout and pricing.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, int_or, name_or_unknown, str_or_empty};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::schedule::resolve_date;

const CART_QUERY: &str = r#"
query GetCart($date: String!) {
  cart(date: $date) {
    items { name entityId qty inventoryId }
  }
}"#;

const ADD_TO_CART_MUTATION: &str = r#"
mutation AddToCart($date: String!, $entityId: Int!, $qty: Int!, $inventoryId: String!) {
  addToCart(date: $date, entityId: $entityId, qty: $qty, inventoryId: $inventoryId) {
    success
    error { message }
    cart { items { name entityId qty inventoryId } }
  }
}"#;

const REMOVE_FROM_CART_MUTATION: &str = r#"
mutation RemoveFromCart($date: String!, $entityId: Int!, $inventoryId: String!) {
  removeFromCart(date: $date, entityId: $entityId, inventoryId: $inventoryId) {
    success
    error { message }
    cart { items { name entityId qty inventoryId } }
  }
}"#;

const CLEAR_CART_MUTATION: &str = r#"
mutation ClearCart($date: String!) {
  clearCart(date: $date) {
    success
    error { message }
    cart { items { name entityId qty inventoryId } }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub name: String,
    pub entity_id: i64,
    pub quantity: i64,
    pub inventory_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartState {
    pub date: String,
    pub item_count: i64,
    pub items: Vec<CartItem>,
}

fn normalize_items(cart: &Value) -> Vec<CartItem> {
    array(cart, "items")
        .iter()
        .map(|line| CartItem {
            name: name_or_unknown(line, "name"),
            entity_id: int_or(line, "entityId", 0),
            quantity: int_or(line, "qty", 0),
            inventory_id: str_or_empty(line, "inventoryId"),
        })
        .collect()
}

fn cart_state(date: String, cart: &Value) -> CartState {
    let items = normalize_items(cart);
    CartState {
        date,
        item_count: items.iter().map(|item| item.quantity).sum(),
        items,
    }
}

/// Unwrap a `{success, error, cart}` mutation payload, surfacing a typed
/// upstream rejection as [`GatewayError::Rejected`].
fn unwrap_mutation(data: &Value, field: &str) -> Result<Value, GatewayError> {
    let payload = data.get(field).cloned().unwrap_or(Value::Null);
    let success = payload
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let message = payload
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("the upstream service rejected the request")
            .to_string();
        return Err(GatewayError::Rejected {
            message,
            out_of_stock: Vec::new(),
        });
    }
    Ok(payload.get("cart").cloned().unwrap_or(Value::Null))
}

/// Current cart contents for a date, always fetched fresh.
pub(crate) async fn fetch_cart(
    gateway: &Gateway,
    date: &str,
) -> Result<Vec<CartItem>, GatewayError> {
    let data = gateway
        .execute(
            Service::Subscription,
            CART_QUERY,
            "GetCart",
            json!({"date": date}),
        )
        .await?;
    Ok(normalize_items(
        &data.get("cart").cloned().unwrap_or(Value::Null),
    ))
}

pub async fn add_to_cart(
    gateway: &Gateway,
    date: Option<&str>,
    entity_id: i64,
    quantity: u32,
    inventory_id: &str,
) -> Result<CartState, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let data = gateway
        .execute(
            Service::Subscription,
            ADD_TO_CART_MUTATION,
            "AddToCart",
            json!({
                "date": date,
                "entityId": entity_id,
                "qty": quantity,
                "inventoryId": inventory_id,
            }),
        )
        .await?;
    let cart = unwrap_mutation(&data, "addToCart")?;
    Ok(cart_state(date, &cart))
}

pub async fn remove_from_cart(
    gateway: &Gateway,
    date: Option<&str>,
    entity_id: i64,
    inventory_id: &str,
) -> Result<CartState, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let data = gateway
        .execute(
            Service::Subscription,
            REMOVE_FROM_CART_MUTATION,
            "RemoveFromCart",
            json!({
                "date": date,
                "entityId": entity_id,
                "inventoryId": inventory_id,
            }),
        )
        .await?;
    let cart = unwrap_mutation(&data, "removeFromCart")?;
    Ok(cart_state(date, &cart))
}

pub async fn clear_cart(
    gateway: &Gateway,
    date: Option<&str>,
) -> Result<CartState, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let data = gateway
        .execute(
            Service::Subscription,
            CLEAR_CART_MUTATION,
            "ClearCart",
            json!({"date": date}),
        )
        .await?;
    let cart = unwrap_mutation(&data, "clearCart")?;
    Ok(cart_state(date, &cart))
}
