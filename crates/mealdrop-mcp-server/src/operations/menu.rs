//! Menu listing, detailed menu listing, and client-side keyword search.

use serde::Serialize;
use serde_json::{Value, json};

use super::{array, float_or, full_name, int_or, name_or_unknown, str_or_empty, string_list};
use crate::errors::GatewayError;
use crate::graphql::{Gateway, Service};
use crate::pagination::{Page, paginate};
use crate::schedule::resolve_date;

const MENU_QUERY: &str = r#"
query GetMenu($date: String!) {
  menu(date: $date) {
    meals {
      id
      entityId
      inventoryId
      sku
      name
      shortDescription
      price
      isSoldOut
      chef { firstName lastName }
      category { id title }
      cuisines
      diets
      proteinTags
      ingredients { name }
    }
  }
}"#;

const MENU_DETAIL_QUERY: &str = r#"
query GetMenuDetail($date: String!) {
  menu(date: $date) {
    meals {
      id
      entityId
      inventoryId
      sku
      name
      shortDescription
      fullDescription
      price
      isSoldOut
      chef { firstName lastName }
      category { id title }
      cuisines
      diets
      proteinTags
      ingredients { name }
      allergens
      heatingInstructions
      nutritionalFacts { calories protein carbs fat }
    }
  }
}"#;

#[derive(Debug, Clone, Serialize)]
pub struct Chef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealTags {
    pub cuisines: Vec<String>,
    pub diets: Vec<String>,
    pub proteins: Vec<String>,
}

/// A menu meal with all optional upstream relations defaulted, so consumers
/// never need a null check.
#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: String,
    pub entity_id: i64,
    pub inventory_id: String,
    pub sku: String,
    pub name: String,
    pub short_description: String,
    pub price: f64,
    pub is_sold_out: bool,
    pub chef: Chef,
    pub category: Category,
    pub tags: MealTags,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Nutrition {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    #[serde(flatten)]
    pub meal: Meal,
    pub description: String,
    pub allergens: Vec<String>,
    pub heating_instructions: String,
    pub nutrition: Nutrition,
}

pub(crate) fn normalize_meal(node: &Value) -> Meal {
    let chef = node.get("chef").cloned().unwrap_or(Value::Null);
    let category = node.get("category").cloned().unwrap_or(Value::Null);
    Meal {
        id: str_or_empty(node, "id"),
        entity_id: int_or(node, "entityId", 0),
        inventory_id: str_or_empty(node, "inventoryId"),
        sku: str_or_empty(node, "sku"),
        name: name_or_unknown(node, "name"),
        short_description: str_or_empty(node, "shortDescription"),
        price: float_or(node, "price", 0.0),
        is_sold_out: node
            .get("isSoldOut")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        chef: Chef {
            name: full_name(&chef),
        },
        category: Category {
            id: str_or_empty(&category, "id"),
            title: str_or_empty(&category, "title"),
        },
        tags: MealTags {
            cuisines: string_list(node, "cuisines"),
            diets: string_list(node, "diets"),
            proteins: string_list(node, "proteinTags"),
        },
        ingredients: array(node, "ingredients")
            .iter()
            .map(|ingredient| name_or_unknown(ingredient, "name"))
            .collect(),
    }
}

fn normalize_detail(node: &Value) -> MealDetail {
    let facts = node.get("nutritionalFacts").cloned().unwrap_or(Value::Null);
    MealDetail {
        meal: normalize_meal(node),
        description: str_or_empty(node, "fullDescription"),
        allergens: string_list(node, "allergens"),
        heating_instructions: str_or_empty(node, "heatingInstructions"),
        nutrition: Nutrition {
            calories: int_or(&facts, "calories", 0),
            protein: int_or(&facts, "protein", 0),
            carbs: int_or(&facts, "carbs", 0),
            fat: int_or(&facts, "fat", 0),
        },
    }
}

async fn fetch_raw_meals(
    gateway: &Gateway,
    query: &str,
    operation_name: &str,
    date: &str,
) -> Result<Vec<Value>, GatewayError> {
    let data = gateway
        .execute(
            Service::Menu,
            query,
            operation_name,
            json!({"date": date}),
        )
        .await?;
    let menu = data.get("menu").cloned().unwrap_or(Value::Null);
    Ok(array(&menu, "meals").to_vec())
}

pub async fn fetch_menu(
    gateway: &Gateway,
    date: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Page<Meal>, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let meals = fetch_raw_meals(gateway, MENU_QUERY, "GetMenu", &date).await?;
    Ok(paginate(
        meals.iter().map(normalize_meal).collect(),
        offset,
        limit,
    ))
}

pub async fn fetch_menu_detail(
    gateway: &Gateway,
    date: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Page<MealDetail>, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let meals = fetch_raw_meals(gateway, MENU_DETAIL_QUERY, "GetMenuDetail", &date).await?;
    Ok(paginate(
        meals.iter().map(normalize_detail).collect(),
        offset,
        limit,
    ))
}

/// Keyword search over the full menu for a date. The upstream has no search
/// operation, so matching happens here: a meal is kept when the lowercased
/// query is a substring of any indexed field. Source order is preserved, no
/// ranking.
pub async fn search_meals(
    gateway: &Gateway,
    query: &str,
    date: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<Page<Meal>, GatewayError> {
    let date = resolve_date(date)?.to_string();
    let needle = query.to_lowercase();
    let meals = fetch_raw_meals(gateway, MENU_QUERY, "GetMenu", &date).await?;
    let matches: Vec<Meal> = meals
        .iter()
        .map(normalize_meal)
        .filter(|meal| matches_query(meal, &needle))
        .collect();
    Ok(paginate(matches, offset, limit))
}

fn matches_query(meal: &Meal, needle: &str) -> bool {
    let in_list = |values: &[String]| values.iter().any(|v| v.to_lowercase().contains(needle));
    meal.name.to_lowercase().contains(needle)
        || meal.short_description.to_lowercase().contains(needle)
        || in_list(&meal.tags.cuisines)
        || in_list(&meal.tags.diets)
        || in_list(&meal.ingredients)
        || in_list(&meal.tags.proteins)
        || meal.chef.name.to_lowercase().contains(needle)
        || meal.category.title.to_lowercase().contains(needle)
}
