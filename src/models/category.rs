//! Category model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CategoryId, TransactionKind, lenient_code};

/// A label grouping transactions of one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier.
    pub id: CategoryId,
    /// Unique positive sequence code, assigned on load when missing.
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none",
        alias = "codigo"
    )]
    pub code: Option<u32>,
    /// Display name.
    #[serde(alias = "nome")]
    pub name: String,
    /// Whether the category applies to expenses or incomes.
    #[serde(alias = "tipo")]
    pub kind: TransactionKind,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_category_with_code() {
        let json = r#"{"id": "cd1", "code": 4, "name": "Housing", "kind": "expense"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.code, Some(4));
        assert_eq!(category.kind, TransactionKind::Expense);
    }

    #[test]
    fn garbage_code_reads_as_missing() {
        let json = r#"{"id": "cd1", "code": "x", "name": "Housing", "kind": "expense"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.code, None);

        let json = r#"{"id": "cd1", "code": -3, "name": "Housing", "kind": "expense"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.code, None);
    }

    #[test]
    fn missing_code_is_not_serialized() {
        let category = Category {
            id: CategoryId::from("cr1"),
            code: None,
            name: "Salary".to_owned(),
            kind: TransactionKind::Income,
            extra: Map::new(),
        };
        let value = serde_json::to_value(&category).unwrap();
        assert!(value.get("code").is_none());
    }

    #[test]
    fn missing_kind_is_rejected() {
        let result = serde_json::from_str::<Category>(r#"{"id": "cd1", "name": "Housing"}"#);
        assert!(result.is_err());
    }
}
