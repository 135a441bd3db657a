//! The MCP tool surface: one thin tool per domain operation, dispatching into
//! [`crate::operations`] and mapping gateway errors into MCP errors without
//! losing their classification.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation,
    InitializeRequestParam, InitializeResult, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{GatewayError, McpError};
use crate::graphql::Gateway;
use crate::operations::pricing::ItemInput;
use crate::operations::{
    cart, checkout, delivery_days, invoices, menu, orders, pricing, profile, skip,
};
use crate::schema_from_type;

pub const GET_MENU_TOOL_NAME: &str = "get_menu";
pub const GET_MENU_DETAIL_TOOL_NAME: &str = "get_menu_detail";
pub const SEARCH_MEALS_TOOL_NAME: &str = "search_meals";
pub const GET_PROFILE_TOOL_NAME: &str = "get_profile";
pub const GET_ORDERS_TOOL_NAME: &str = "get_orders";
pub const GET_UPCOMING_DAYS_TOOL_NAME: &str = "get_upcoming_days";
pub const ADD_TO_CART_TOOL_NAME: &str = "add_to_cart";
pub const REMOVE_FROM_CART_TOOL_NAME: &str = "remove_from_cart";
pub const CLEAR_CART_TOOL_NAME: &str = "clear_cart";
pub const SKIP_DELIVERY_TOOL_NAME: &str = "skip_delivery";
pub const UNSKIP_DELIVERY_TOOL_NAME: &str = "unskip_delivery";
pub const CREATE_ORDER_TOOL_NAME: &str = "create_order";
pub const GET_PRICE_BREAKDOWN_TOOL_NAME: &str = "get_price_breakdown";
pub const GET_INVOICES_TOOL_NAME: &str = "get_invoices";

const DEFAULT_LIMIT: usize = 20;

/// Menu listing input.
#[derive(Deserialize, JsonSchema, Default)]
struct MenuInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// Number of meals to skip
    offset: Option<usize>,
    /// Maximum number of meals to return
    limit: Option<usize>,
}

/// Keyword search input.
#[derive(Deserialize, JsonSchema)]
struct SearchInput {
    /// Keyword to search for (matched against names, descriptions, tags,
    /// ingredients, chefs, and categories)
    query: String,
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// Number of matches to skip
    offset: Option<usize>,
    /// Maximum number of matches to return
    limit: Option<usize>,
}

/// Plain offset/limit pagination input.
#[derive(Deserialize, JsonSchema, Default)]
struct PageInput {
    /// Number of entries to skip
    offset: Option<usize>,
    /// Maximum number of entries to return
    limit: Option<usize>,
}

#[derive(Deserialize, JsonSchema)]
struct AddToCartInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// The meal entity id from the menu
    entity_id: i64,
    /// Number of units to add
    quantity: u32,
    /// The meal's inventory id from the menu
    inventory_id: String,
}

#[derive(Deserialize, JsonSchema)]
struct RemoveFromCartInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// The meal entity id from the menu
    entity_id: i64,
    /// The meal's inventory id from the menu
    inventory_id: String,
}

/// Input for tools that only take an optional delivery date.
#[derive(Deserialize, JsonSchema, Default)]
struct DateInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
}

#[derive(Deserialize, JsonSchema, Default)]
struct CreateOrderInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// Delivery window start as HH:MM; requires time_end
    time_start: Option<String>,
    /// Delivery window end as HH:MM; requires time_start
    time_end: Option<String>,
}

#[derive(Deserialize, JsonSchema, Default)]
struct PriceBreakdownInput {
    /// Delivery date as YYYY-MM-DD; defaults to the next delivery day
    date: Option<String>,
    /// Meals to price; defaults to the current cart contents for the date
    meals: Option<Vec<ItemInput>>,
}

#[derive(Deserialize, JsonSchema, Default)]
struct EmptyInput {}

/// The MCP server handler backed by the Mealdrop gateway.
#[derive(Clone)]
pub struct MealdropServerHandler {
    gateway: Arc<Gateway>,
}

impl MealdropServerHandler {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

pub(crate) fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            GET_MENU_TOOL_NAME,
            "Get the meal menu for a delivery date",
            schema_from_type!(MenuInput),
        ),
        Tool::new(
            GET_MENU_DETAIL_TOOL_NAME,
            "Get the meal menu with full descriptions, allergens, and nutrition facts",
            schema_from_type!(MenuInput),
        ),
        Tool::new(
            SEARCH_MEALS_TOOL_NAME,
            "Search the menu for a delivery date by keyword",
            schema_from_type!(SearchInput),
        ),
        Tool::new(
            GET_PROFILE_TOOL_NAME,
            "Get the account profile, subscription plan, and delivery windows",
            schema_from_type!(EmptyInput),
        ),
        Tool::new(
            GET_ORDERS_TOOL_NAME,
            "List all orders on the account",
            schema_from_type!(PageInput),
        ),
        Tool::new(
            GET_UPCOMING_DAYS_TOOL_NAME,
            "List upcoming delivery days with their status, cart, and order state",
            schema_from_type!(EmptyInput),
        ),
        Tool::new(
            ADD_TO_CART_TOOL_NAME,
            "Add a meal to the cart for a delivery date",
            schema_from_type!(AddToCartInput),
        ),
        Tool::new(
            REMOVE_FROM_CART_TOOL_NAME,
            "Remove a meal from the cart for a delivery date",
            schema_from_type!(RemoveFromCartInput),
        ),
        Tool::new(
            CLEAR_CART_TOOL_NAME,
            "Remove every meal from the cart for a delivery date",
            schema_from_type!(DateInput),
        ),
        Tool::new(
            SKIP_DELIVERY_TOOL_NAME,
            "Skip a delivery day",
            schema_from_type!(DateInput),
        ),
        Tool::new(
            UNSKIP_DELIVERY_TOOL_NAME,
            "Reinstate a previously skipped delivery day",
            schema_from_type!(DateInput),
        ),
        Tool::new(
            CREATE_ORDER_TOOL_NAME,
            "Create an order from the current cart for a delivery date",
            schema_from_type!(CreateOrderInput),
        ),
        Tool::new(
            GET_PRICE_BREAKDOWN_TOOL_NAME,
            "Compute the price breakdown for given meals or the current cart",
            schema_from_type!(PriceBreakdownInput),
        ),
        Tool::new(
            GET_INVOICES_TOOL_NAME,
            "List invoices on the account",
            schema_from_type!(PageInput),
        ),
    ]
}

/// Map a gateway error to an MCP error, carrying the taxonomy in the error
/// data so callers can classify without string matching.
pub(crate) fn tool_error(error: GatewayError) -> McpError {
    let kind = match &error {
        GatewayError::Auth(_) => "authentication_failed",
        GatewayError::InvalidCredentials => "invalid_credentials",
        GatewayError::RateLimited => "rate_limited",
        GatewayError::Transport(_) | GatewayError::Request(_) => "transport",
        GatewayError::GraphQl(_) => "graphql",
        GatewayError::MalformedResponse(_) => "malformed_response",
        GatewayError::Precondition(_) => "precondition",
        GatewayError::Rejected { .. } => "rejected",
    };
    let data = match &error {
        GatewayError::Rejected { out_of_stock, .. } if !out_of_stock.is_empty() => {
            json!({"kind": kind, "out_of_stock": out_of_stock})
        }
        _ => json!({"kind": kind}),
    };
    let code = match &error {
        GatewayError::Precondition(_) => ErrorCode::INVALID_PARAMS,
        _ => ErrorCode::INTERNAL_ERROR,
    };
    McpError::new(code, error.to_string(), Some(data))
}

fn tool_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_value(value).map_err(|error| {
        McpError::new(
            ErrorCode::INTERNAL_ERROR,
            format!("Failed to serialize tool result: {error}"),
            None,
        )
    })?;
    Ok(CallToolResult {
        content: vec![Content::json(&json).unwrap_or(Content::text(json.to_string()))],
        is_error: Some(false),
    })
}

fn convert_arguments<T: serde::de::DeserializeOwned>(
    request: &CallToolRequestParam,
) -> Result<T, McpError> {
    serde_json::from_value(Value::from(request.arguments.clone()))
        .map_err(|_| McpError::new(ErrorCode::INVALID_PARAMS, "Invalid input".to_string(), None))
}

fn tool_not_found(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Tool {name} not found"),
        None,
    )
}

fn page_bounds(offset: Option<usize>, limit: Option<usize>) -> (usize, usize) {
    (offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIMIT))
}

impl MealdropServerHandler {
    async fn dispatch(&self, request: &CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let gateway = self.gateway.as_ref();
        match request.name.as_ref() {
            GET_MENU_TOOL_NAME => {
                let input: MenuInput = convert_arguments(request)?;
                let (offset, limit) = page_bounds(input.offset, input.limit);
                menu::fetch_menu(gateway, input.date.as_deref(), offset, limit)
                    .await
                    .map_err(tool_error)
                    .and_then(|page| tool_result(&page))
            }
            GET_MENU_DETAIL_TOOL_NAME => {
                let input: MenuInput = convert_arguments(request)?;
                let (offset, limit) = page_bounds(input.offset, input.limit);
                menu::fetch_menu_detail(gateway, input.date.as_deref(), offset, limit)
                    .await
                    .map_err(tool_error)
                    .and_then(|page| tool_result(&page))
            }
            SEARCH_MEALS_TOOL_NAME => {
                let input: SearchInput = convert_arguments(request)?;
                let (offset, limit) = page_bounds(input.offset, input.limit);
                menu::search_meals(gateway, &input.query, input.date.as_deref(), offset, limit)
                    .await
                    .map_err(tool_error)
                    .and_then(|page| tool_result(&page))
            }
            GET_PROFILE_TOOL_NAME => profile::fetch_profile(gateway)
                .await
                .map_err(tool_error)
                .and_then(|profile| tool_result(&profile)),
            GET_ORDERS_TOOL_NAME => {
                let input: PageInput = convert_arguments(request)?;
                let (offset, limit) = page_bounds(input.offset, input.limit);
                orders::list_orders(gateway, offset, limit)
                    .await
                    .map_err(tool_error)
                    .and_then(|page| tool_result(&page))
            }
            GET_UPCOMING_DAYS_TOOL_NAME => delivery_days::upcoming_days(gateway)
                .await
                .map_err(tool_error)
                .and_then(|days| tool_result(&days)),
            ADD_TO_CART_TOOL_NAME => {
                let input: AddToCartInput = convert_arguments(request)?;
                if input.quantity == 0 {
                    return Err(McpError::new(
                        ErrorCode::INVALID_PARAMS,
                        "quantity must be a positive integer".to_string(),
                        None,
                    ));
                }
                cart::add_to_cart(
                    gateway,
                    input.date.as_deref(),
                    input.entity_id,
                    input.quantity,
                    &input.inventory_id,
                )
                .await
                .map_err(tool_error)
                .and_then(|state| tool_result(&state))
            }
            REMOVE_FROM_CART_TOOL_NAME => {
                let input: RemoveFromCartInput = convert_arguments(request)?;
                cart::remove_from_cart(
                    gateway,
                    input.date.as_deref(),
                    input.entity_id,
                    &input.inventory_id,
                )
                .await
                .map_err(tool_error)
                .and_then(|state| tool_result(&state))
            }
            CLEAR_CART_TOOL_NAME => {
                let input: DateInput = convert_arguments(request)?;
                cart::clear_cart(gateway, input.date.as_deref())
                    .await
                    .map_err(tool_error)
                    .and_then(|state| tool_result(&state))
            }
            SKIP_DELIVERY_TOOL_NAME => {
                let input: DateInput = convert_arguments(request)?;
                skip::skip_delivery(gateway, input.date.as_deref())
                    .await
                    .map_err(tool_error)
                    .and_then(|result| tool_result(&result))
            }
            UNSKIP_DELIVERY_TOOL_NAME => {
                let input: DateInput = convert_arguments(request)?;
                skip::unskip_delivery(gateway, input.date.as_deref())
                    .await
                    .map_err(tool_error)
                    .and_then(|result| tool_result(&result))
            }
            CREATE_ORDER_TOOL_NAME => {
                let input: CreateOrderInput = convert_arguments(request)?;
                let window = match (input.time_start, input.time_end) {
                    (Some(start), Some(end)) => Some((start, end)),
                    (None, None) => None,
                    _ => {
                        return Err(McpError::new(
                            ErrorCode::INVALID_PARAMS,
                            "time_start and time_end must be given together".to_string(),
                            None,
                        ));
                    }
                };
                checkout::create_order(gateway, input.date.as_deref(), window)
                    .await
                    .map_err(tool_error)
                    .and_then(|confirmation| tool_result(&confirmation))
            }
            GET_PRICE_BREAKDOWN_TOOL_NAME => {
                let input: PriceBreakdownInput = convert_arguments(request)?;
                pricing::price_breakdown(gateway, input.date.as_deref(), input.meals)
                    .await
                    .map_err(tool_error)
                    .and_then(|breakdown| tool_result(&breakdown))
            }
            GET_INVOICES_TOOL_NAME => {
                let input: PageInput = convert_arguments(request)?;
                let (offset, limit) = page_bounds(input.offset, input.limit);
                invoices::list_invoices(gateway, offset, limit)
                    .await
                    .map_err(tool_error)
                    .and_then(|page| tool_result(&page))
            }
            other => Err(tool_not_found(other)),
        }
    }
}

impl ServerHandler for MealdropServerHandler {
    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "tool call");
        self.dispatch(&request).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: tool_definitions(),
        })
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "Mealdrop MCP Server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::collections::HashSet;

    #[test]
    fn tool_names_are_unique() {
        let tools = tool_definitions();
        let names: HashSet<_> = tools.iter().map(|tool| tool.name.clone()).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 14);
    }

    #[test]
    fn error_kinds_survive_the_mcp_mapping() {
        let kind = |error: GatewayError| {
            tool_error(error)
                .data
                .and_then(|data| data.get("kind").cloned())
        };
        assert_eq!(
            kind(GatewayError::InvalidCredentials),
            Some(json!("invalid_credentials"))
        );
        assert_eq!(
            kind(GatewayError::Transport(StatusCode::INTERNAL_SERVER_ERROR)),
            Some(json!("transport"))
        );
        assert_ne!(
            kind(GatewayError::InvalidCredentials),
            kind(GatewayError::Transport(StatusCode::INTERNAL_SERVER_ERROR))
        );
        assert_eq!(kind(GatewayError::RateLimited), Some(json!("rate_limited")));
    }

    #[test]
    fn rejection_data_carries_out_of_stock_ids() {
        let error = tool_error(GatewayError::Rejected {
            message: "some items are out of stock".to_string(),
            out_of_stock: vec!["inv-101".to_string()],
        });
        let data = error.data.expect("data");
        assert_eq!(data["out_of_stock"], json!(["inv-101"]));
    }

    #[test]
    fn preconditions_map_to_invalid_params() {
        let error = tool_error(GatewayError::Precondition("empty cart".to_string()));
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    }
}
