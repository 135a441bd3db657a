//! User profile fetch, including the configured delivery time windows used as
//! a fallback during order confirmation.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, full_name, int_or, str_or_empty};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};

const PROFILE_QUERY: &str = r#"
query GetUserProfile {
  me {
    id
    email
    firstName
    lastName
    subscription { planName mealsPerWeek status }
    deliveryDays { day timeStart timeEnd }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub name: String,
    pub meals_per_week: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryWindow {
    pub day: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub delivery_windows: Vec<DeliveryWindow>,
}

impl Profile {
    /// The first configured delivery window, if the account has any.
    pub fn first_window(&self) -> Option<(String, String)> {
        self.delivery_windows
            .first()
            .map(|window| (window.start.clone(), window.end.clone()))
    }
}

pub(crate) fn normalize_profile(node: &Value) -> Profile {
    let plan = node.get("subscription").cloned().unwrap_or(Value::Null);
    Profile {
        id: str_or_empty(node, "id"),
        email: str_or_empty(node, "email"),
        name: full_name(node),
        plan: Plan {
            name: str_or_empty(&plan, "planName"),
            meals_per_week: int_or(&plan, "mealsPerWeek", 0),
            status: str_or_empty(&plan, "status"),
        },
        delivery_windows: array(node, "deliveryDays")
            .iter()
            .map(|window| DeliveryWindow {
                day: str_or_empty(window, "day"),
                start: str_or_empty(window, "timeStart"),
                end: str_or_empty(window, "timeEnd"),
            })
            .collect(),
    }
}

pub async fn fetch_profile(gateway: &Gateway) -> Result<Profile, GatewayError> {
    let data = gateway
        .execute(
            Service::Subscription,
            PROFILE_QUERY,
            "GetUserProfile",
            json!({}),
        )
        .await?;
    let me = data.get("me").cloned().unwrap_or(Value::Null);
    Ok(normalize_profile(&me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::tests::test_gateway;

    #[tokio::test]
    async fn profile_is_normalized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({"data": {"me": {
                    "id": "user-1",
                    "email": "user@example.com",
                    "firstName": "Pat",
                    "lastName": "Singh",
                    "subscription": {"planName": "6 meals", "mealsPerWeek": 6, "status": "active"},
                    "deliveryDays": [
                        {"day": "monday", "timeStart": "09:00", "timeEnd": "13:00"},
                        {"day": "thursday", "timeStart": "14:00", "timeEnd": "18:00"}
                    ]
                }}})
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = test_gateway(&server).await;
        let profile = fetch_profile(&gateway).await.expect("profile");
        assert_eq!(profile.name, "Pat Singh");
        assert_eq!(profile.plan.meals_per_week, 6);
        assert_eq!(
            profile.first_window(),
            Some(("09:00".to_string(), "13:00".to_string()))
        );
    }

    #[test]
    fn missing_relations_default_to_safe_values() {
        let profile = normalize_profile(&json!({"id": "user-2"}));
        assert_eq!(profile.plan.name, "");
        assert_eq!(profile.plan.meals_per_week, 0);
        assert!(profile.delivery_windows.is_empty());
        assert_eq!(profile.first_window(), None);
    }
}
