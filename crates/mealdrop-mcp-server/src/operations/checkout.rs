//! Order confirmation. The order is always built from the current cart for
//! the target date, fetched fresh; the delivery window falls back from the
//! caller's choice to the profile's first configured window to a fixed
//! default.

use serde::Serialize;
use serde_json::{Value, json};

use super::pricing::{ItemInput, items_variable};
use super::{array, cart, float_or, int_or, profile, str_or_empty, string_list};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::schedule::resolve_date;

/// Window used when the caller passes none and the profile lookup yields none.
pub const DEFAULT_WINDOW: (&str, &str) = ("11:00", "20:00");

const CREATE_ORDER_MUTATION: &str = r#"
mutation CreateOrder($date: String!, $items: [OrderItemInput!]!, $timeStart: String!, $timeEnd: String!) {
  createOrder(date: $date, items: $items, timeStart: $timeStart, timeEnd: $timeEnd) {
    success
    error { message outOfStock }
    order { id date total items { qty } }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub date: String,
    pub total: f64,
    pub item_count: i64,
    pub time_start: String,
    pub time_end: String,
}

/// Resolve the delivery window. A failed profile fetch is deliberately
/// swallowed here: it only costs us the enriched default, not the order.
async fn resolve_window(gateway: &Gateway, window: Option<(String, String)>) -> (String, String) {
    if let Some(window) = window {
        return window;
    }
    let fallback = || (DEFAULT_WINDOW.0.to_string(), DEFAULT_WINDOW.1.to_string());
    match profile::fetch_profile(gateway).await {
        Ok(profile) => profile.first_window().unwrap_or_else(fallback),
        Err(_) => fallback(),
    }
}

pub async fn create_order(
    gateway: &Gateway,
    date: Option<&str>,
    window: Option<(String, String)>,
) -> Result<OrderConfirmation, GatewayError> {
    let date = resolve_date(date)?.to_string();

    let items: Vec<ItemInput> = cart::fetch_cart(gateway, &date)
        .await?
        .into_iter()
        .map(ItemInput::from)
        .collect();
    if items.is_empty() {
        return Err(GatewayError::Precondition(format!(
            "cart for {date} is empty; add meals before creating an order"
        )));
    }

    let (time_start, time_end) = resolve_window(gateway, window).await;

    let data = gateway
        .execute(
            Service::Subscription,
            CREATE_ORDER_MUTATION,
            "CreateOrder",
            json!({
                "date": date,
                "items": items_variable(&items),
                "timeStart": time_start,
                "timeEnd": time_end,
            }),
        )
        .await?;

    let payload = data.get("createOrder").cloned().unwrap_or(Value::Null);
    let success = payload
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let error = payload.get("error").cloned().unwrap_or(Value::Null);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("the order was rejected")
            .to_string();
        return Err(GatewayError::Rejected {
            message,
            out_of_stock: string_list(&error, "outOfStock"),
        });
    }

    let order = payload.get("order").cloned().unwrap_or(Value::Null);
    Ok(OrderConfirmation {
        order_id: str_or_empty(&order, "id"),
        date,
        total: float_or(&order, "total", 0.0),
        item_count: array(&order, "items")
            .iter()
            .map(|line| int_or(line, "qty", 0))
            .sum(),
        time_start,
        time_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::tests::test_gateway;
    use mockito::Matcher;

    async fn cart_mock(server: &mut mockito::ServerGuard, items: Value) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"operationName": "GetCart"})))
            .with_status(200)
            .with_body(json!({"data": {"cart": {"items": items}}}).to_string())
            .create_async()
            .await
    }

    fn order_success_body() -> String {
        json!({"data": {"createOrder": {
            "success": true,
            "order": {
                "id": "order-77",
                "date": "2026-08-31",
                "total": 52.4,
                "items": [{"qty": 2}, {"qty": 1}]
            }
        }}})
        .to_string()
    }

    #[tokio::test]
    async fn empty_cart_fails_before_the_order_call() {
        let mut server = mockito::Server::new_async().await;
        let _cart = cart_mock(&mut server, json!([])).await;
        let order = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"operationName": "CreateOrder"})))
            .expect(0)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = create_order(&gateway, Some("2026-08-31"), None)
            .await
            .expect_err("must fail");
        assert!(matches!(error, GatewayError::Precondition(_)));
        order.assert_async().await;
    }

    #[tokio::test]
    async fn explicit_window_is_used_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _cart = cart_mock(
            &mut server,
            json!([{"name": "Bowl", "entityId": 101, "qty": 2, "inventoryId": "inv-101"}]),
        )
        .await;
        let profile = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                json!({"operationName": "GetUserProfile"}),
            ))
            .expect(0)
            .create_async()
            .await;
        let order = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"operationName": "CreateOrder"})),
                Matcher::PartialJson(
                    json!({"variables": {"timeStart": "12:00", "timeEnd": "16:00"}}),
                ),
            ]))
            .with_status(200)
            .with_body(order_success_body())
            .expect(1)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let confirmation = create_order(
            &gateway,
            Some("2026-08-31"),
            Some(("12:00".to_string(), "16:00".to_string())),
        )
        .await
        .expect("confirmation");
        assert_eq!(confirmation.order_id, "order-77");
        assert_eq!(confirmation.item_count, 3);
        profile.assert_async().await;
        order.assert_async().await;
    }

    #[tokio::test]
    async fn window_falls_back_to_the_profile() {
        let mut server = mockito::Server::new_async().await;
        let _cart = cart_mock(
            &mut server,
            json!([{"entityId": 101, "qty": 1, "inventoryId": "inv-101"}]),
        )
        .await;
        let _profile = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                json!({"operationName": "GetUserProfile"}),
            ))
            .with_status(200)
            .with_body(
                json!({"data": {"me": {
                    "deliveryDays": [{"day": "monday", "timeStart": "09:00", "timeEnd": "13:00"}]
                }}})
                .to_string(),
            )
            .create_async()
            .await;
        let order = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"operationName": "CreateOrder"})),
                Matcher::PartialJson(
                    json!({"variables": {"timeStart": "09:00", "timeEnd": "13:00"}}),
                ),
            ]))
            .with_status(200)
            .with_body(order_success_body())
            .expect(1)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        create_order(&gateway, Some("2026-08-31"), None)
            .await
            .expect("confirmation");
        order.assert_async().await;
    }

    #[tokio::test]
    async fn failed_profile_lookup_falls_back_to_the_default_window() {
        let mut server = mockito::Server::new_async().await;
        let _cart = cart_mock(
            &mut server,
            json!([{"entityId": 101, "qty": 1, "inventoryId": "inv-101"}]),
        )
        .await;
        let _profile = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                json!({"operationName": "GetUserProfile"}),
            ))
            .with_status(500)
            .create_async()
            .await;
        let order = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"operationName": "CreateOrder"})),
                Matcher::PartialJson(
                    json!({"variables": {"timeStart": "11:00", "timeEnd": "20:00"}}),
                ),
            ]))
            .with_status(200)
            .with_body(order_success_body())
            .expect(1)
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        create_order(&gateway, Some("2026-08-31"), None)
            .await
            .expect("confirmation");
        order.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_carries_out_of_stock_ids() {
        let mut server = mockito::Server::new_async().await;
        let _cart = cart_mock(
            &mut server,
            json!([{"entityId": 101, "qty": 1, "inventoryId": "inv-101"}]),
        )
        .await;
        let _order = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"operationName": "CreateOrder"})))
            .with_status(200)
            .with_body(
                json!({"data": {"createOrder": {
                    "success": false,
                    "error": {"message": "some items are out of stock", "outOfStock": ["inv-101"]}
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let error = create_order(
            &gateway,
            Some("2026-08-31"),
            Some(("11:00".to_string(), "20:00".to_string())),
        )
        .await
        .expect_err("must fail");
        match error {
            GatewayError::Rejected { message, out_of_stock } => {
                assert_eq!(message, "some items are out of stock");
                assert_eq!(out_of_stock, vec!["inv-101".to_string()]);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
