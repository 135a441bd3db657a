//! Skip and unskip a delivery day.

use serde::Serialize;
use serde_json::{Value, json};

use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::schedule::resolve_date;

const SKIP_MUTATION: &str = r#"
mutation SkipDelivery($date: String!) {
  skipDelivery(date: $date) {
    success
    error { message }
  }
}"#;

const UNSKIP_MUTATION: &str = r#"
mutation UnskipDelivery($date: String!) {
  unskipDelivery(date: $date) {
    success
    error { message }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct SkipResult {
    pub date: String,
    pub skipped: bool,
}

async fn toggle(
    gateway: &Gateway,
    date: Option<&str>,
    mutation: &str,
    operation_name: &str,
    field: &str,
    skipped: bool,
) -> Result<SkipResult, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let data = gateway
        .execute(
            Service::Subscription,
            mutation,
            operation_name,
            json!({"date": date}),
        )
        .await?;
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
    Ok(SkipResult { date, skipped })
}

pub async fn skip_delivery(
    gateway: &Gateway,
    date: Option<&str>,
) -> Result<SkipResult, GatewayError> {
    toggle(gateway, date, SKIP_MUTATION, "SkipDelivery", "skipDelivery", true).await
}

pub async fn unskip_delivery(
    gateway: &Gateway,
    date: Option<&str>,
) -> Result<SkipResult, GatewayError> {
    toggle(
        gateway,
        date,
        UNSKIP_MUTATION,
        "UnskipDelivery",
        "unskipDelivery",
        false,
    )
    .await
}
