//! Invoice listing.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, float_or, str_or_empty};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::pagination::{Page, paginate};

const INVOICES_QUERY: &str = r#"
query GetInvoices {
  invoices {
    id
    date
    status
    total
    downloadUrl
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: String,
    pub date: String,
    pub status: String,
    pub total: f64,
    pub download_url: String,
}

fn normalize_invoice(node: &Value) -> Invoice {
    Invoice {
        id: str_or_empty(node, "id"),
        date: str_or_empty(node, "date"),
        status: str_or_empty(node, "status"),
        total: float_or(node, "total", 0.0),
        download_url: str_or_empty(node, "downloadUrl"),
    }
}

pub async fn list_invoices(
    gateway: &Gateway,
    offset: usize,
    limit: usize,
) -> Result<Page<Invoice>, GatewayError> {
    let data = gateway
        .execute(Service::Subscription, INVOICES_QUERY, "GetInvoices", json!({}))
        .await?;
    Ok(paginate(
        array(&data, "invoices")
            .iter()
            .map(normalize_invoice)
            .collect(),
        offset,
        limit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::tests::test_gateway;

    #[tokio::test]
    async fn invoices_are_listed_with_defaults() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({"data": {"invoices": [
                    {"id": "inv-1", "date": "2026-08-24", "status": "paid", "total": 61.2,
                     "downloadUrl": "https://billing.mealdrop.com/inv-1.pdf"},
                    {"id": "inv-2"}
                ]}})
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let page = list_invoices(&gateway, 0, 10).await.expect("invoices");
        assert_eq!(page.total, 2);
        assert_eq!(page.items.get(1).map(|i| i.download_url.as_str()), Some(""));
        assert_eq!(page.items.get(1).map(|i| i.total), Some(0.0));
    }
}
