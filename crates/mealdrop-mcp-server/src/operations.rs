//! Domain operations against the Mealdrop services. Each submodule owns its
//! GraphQL documents and the normalization of the raw payloads into stable
//! output shapes.

use serde_json::Value;

pub mod cart;
pub mod checkout;
pub mod delivery_days;
pub mod invoices;
pub mod menu;
pub mod orders;
pub mod pricing;
pub mod profile;
pub mod skip;

/// A string field, or `"Unknown"` when the upstream omits it.
pub(crate) fn name_or_unknown(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// A string field, or the empty string when the upstream omits it.
pub(crate) fn str_or_empty(node: &Value, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn string_list(node: &Value, key: &str) -> Vec<String> {
    node.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn int_or(node: &Value, key: &str, default: i64) -> i64 {
    node.get(key).and_then(Value::as_i64).unwrap_or(default)
}

pub(crate) fn float_or(node: &Value, key: &str, default: f64) -> f64 {
    node.get(key).and_then(Value::as_f64).unwrap_or(default)
}

pub(crate) fn array<'a>(node: &'a Value, key: &str) -> &'a [Value] {
    node.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Concatenated and trimmed chef name from a `{firstName, lastName}` node.
/// Either half may be missing upstream.
pub(crate) fn full_name(node: &Value) -> String {
    let first = str_or_empty(node, "firstName");
    let last = str_or_empty(node, "lastName");
    format!("{first} {last}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_names_default_to_unknown() {
        assert_eq!(name_or_unknown(&json!({}), "name"), "Unknown");
        assert_eq!(name_or_unknown(&json!({"name": ""}), "name"), "Unknown");
        assert_eq!(name_or_unknown(&json!({"name": "Bowl"}), "name"), "Bowl");
    }

    #[test]
    fn chef_names_are_trimmed() {
        assert_eq!(
            full_name(&json!({"firstName": "Ana", "lastName": "Reyes"})),
            "Ana Reyes"
        );
        assert_eq!(full_name(&json!({"firstName": "Ana"})), "Ana");
        assert_eq!(full_name(&json!({"lastName": "Reyes"})), "Reyes");
        assert_eq!(full_name(&json!({})), "");
    }

    #[test]
    fn absent_arrays_default_to_empty() {
        assert!(array(&json!({}), "items").is_empty());
        assert!(string_list(&json!({"tags": null}), "tags").is_empty());
    }
}
