//! Savings goal model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{GoalId, default_true};
use crate::engine::status::parse_date;

/// A target amount to accumulate by a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier.
    pub id: GoalId,
    /// Display name.
    #[serde(alias = "nome")]
    pub name: String,
    /// Amount to reach.
    #[serde(with = "rust_decimal::serde::float", alias = "valor_meta")]
    pub target_amount: Decimal,
    /// Amount accumulated so far.
    #[serde(
        default,
        with = "rust_decimal::serde::float",
        alias = "valor_atual"
    )]
    pub accumulated_amount: Decimal,
    /// Deadline (`YYYY-MM-DD`).
    #[serde(default, alias = "data_meta")]
    pub target_date: Option<String>,
    /// Whether the goal still receives contributions.
    #[serde(default = "default_true", alias = "ativa")]
    pub active: bool,
    /// Percentage of each settled income routed to this goal.
    #[serde(
        default,
        with = "rust_decimal::serde::float",
        skip_serializing_if = "Decimal::is_zero"
    )]
    pub contribution_percent: Decimal,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Goal {
    /// Parsed deadline, if present and readable.
    #[inline]
    #[must_use]
    pub fn deadline(&self) -> Option<NaiveDate> {
        self.target_date.as_deref().and_then(parse_date)
    }
}
