//! Monthly budget model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BudgetId, CategoryId, default_true};

/// A monthly spending limit for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Unique identifier.
    pub id: BudgetId,
    /// Category the limit applies to.
    #[serde(alias = "categoria_id")]
    pub category_id: CategoryId,
    /// Maximum monthly spend.
    #[serde(
        default,
        with = "rust_decimal::serde::float",
        alias = "limite_mensal"
    )]
    pub monthly_limit: Decimal,
    /// Whether the budget is enforced.
    #[serde(default = "default_true", alias = "ativo")]
    pub active: bool,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
