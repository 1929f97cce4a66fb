//! Unified transaction model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AccountId, CategoryId, InstallmentGroupId, Status, TransactionId, TransactionKind};
use super::{DEFAULT_ACCOUNT_ID, lenient_code};
use crate::engine::status::{derive_status_on, parse_date, today};

/// Position of a transaction inside an installment group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// Identifier shared by every installment of the group.
    pub group_id: InstallmentGroupId,
    /// One-based position within the group.
    pub index: u32,
    /// Number of installments in the group.
    pub total: u32,
}

/// An expense or income with a planned and an optional settled date.
///
/// Dates are kept as the ISO strings found in the document so that a
/// record with an unreadable date still loads; see [`Self::due`] and
/// [`Self::settled_on`] for the parsed forms.
///
/// Amounts are written as JSON numbers, so values beyond the 15 to 17
/// significant digits of an `f64` do not survive a save. Cent amounts of
/// any realistic size do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Unique positive sequence code, assigned on load when missing.
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none",
        alias = "codigo"
    )]
    pub code: Option<u32>,
    /// Expense or income.
    #[serde(alias = "tipo")]
    pub kind: TransactionKind,
    /// Free-text description.
    #[serde(default, alias = "descricao")]
    pub description: String,
    /// Non-negative amount; the sign comes from [`Self::kind`].
    #[serde(with = "rust_decimal::serde::float", alias = "valor")]
    pub amount: Decimal,
    /// Planned settlement date (`YYYY-MM-DD`).
    #[serde(default, alias = "data_prevista")]
    pub due_date: Option<String>,
    /// Actual settlement date; presence means settled.
    #[serde(default, alias = "data_efetiva")]
    pub settled_date: Option<String>,
    /// How the transaction was settled (card, transfer, ...).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "forma_pagamento"
    )]
    pub settlement_method: Option<String>,
    /// Account the money moves through.
    #[serde(default = "default_account_id", alias = "conta_id")]
    pub account_id: AccountId,
    /// Optional category.
    #[serde(default, alias = "categoria_id")]
    pub category_id: Option<CategoryId>,
    /// Soft-delete flag.
    #[serde(default, alias = "excluido")]
    pub deleted: bool,
    /// When the record was soft-deleted.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "excluido_em"
    )]
    pub deleted_at: Option<String>,
    /// Installment group membership.
    #[serde(default)]
    pub installment: Option<Installment>,
    /// Whether the record is a template for monthly copies.
    #[serde(default, alias = "recorrente")]
    pub recurring: bool,
    /// Last edit timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "atualizado_em"
    )]
    pub updated_at: Option<String>,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys the unified shape reads, aliases included.
pub(super) const FIELD_KEYS: &[&str] = &[
    "id",
    "code",
    "codigo",
    "kind",
    "tipo",
    "description",
    "descricao",
    "amount",
    "valor",
    "due_date",
    "data_prevista",
    "settled_date",
    "data_efetiva",
    "settlement_method",
    "forma_pagamento",
    "account_id",
    "conta_id",
    "category_id",
    "categoria_id",
    "deleted",
    "excluido",
    "deleted_at",
    "excluido_em",
    "installment",
    "recurring",
    "recorrente",
    "updated_at",
    "atualizado_em",
];

/// Serde default for [`Transaction::account_id`].
fn default_account_id() -> AccountId {
    AccountId::from(DEFAULT_ACCOUNT_ID)
}

impl Transaction {
    /// Creates an unsettled transaction with every optional field empty.
    #[must_use]
    pub fn new(
        id: TransactionId,
        kind: TransactionKind,
        amount: Decimal,
        due_date: NaiveDate,
        account_id: AccountId,
    ) -> Self {
        Self {
            id,
            code: None,
            kind,
            description: String::new(),
            amount,
            due_date: Some(due_date.to_string()),
            settled_date: None,
            settlement_method: None,
            account_id,
            category_id: None,
            deleted: false,
            deleted_at: None,
            installment: None,
            recurring: false,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Parsed due date, if present and readable.
    #[inline]
    #[must_use]
    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_deref().and_then(parse_date)
    }

    /// Parsed settled date, if present and readable.
    #[inline]
    #[must_use]
    pub fn settled_on(&self) -> Option<NaiveDate> {
        self.settled_date.as_deref().and_then(parse_date)
    }

    /// Whether a settled date is present.
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled_date
            .as_deref()
            .is_some_and(|raw| !raw.trim().is_empty())
    }

    /// Derived status relative to the local current date.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.status_on(today())
    }

    /// Derived status relative to `today`.
    #[inline]
    #[must_use]
    pub fn status_on(&self, today: NaiveDate) -> Status {
        derive_status_on(
            self.due_date.as_deref(),
            self.settled_date.as_deref(),
            today,
        )
    }

    /// Amount with the sign of its direction: positive for income,
    /// negative for expense.
    #[inline]
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }

    /// Date used for period queries: the settled date when present,
    /// otherwise the due date.
    #[inline]
    #[must_use]
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.settled_on().or_else(|| self.due())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deserialize_unified_transaction() {
        let json = r#"{
            "id": "t-1",
            "code": 7,
            "kind": "expense",
            "description": "Rent",
            "amount": 1200.0,
            "due_date": "2024-03-05",
            "settled_date": null,
            "account_id": "c1",
            "category_id": "cd1",
            "deleted": false,
            "installment": null,
            "recurring": true
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.code, Some(7));
        assert_eq!(tx.amount, "1200".parse::<Decimal>().unwrap());
        assert_eq!(tx.due(), Some(date(2024, 3, 5)));
        assert!(!tx.is_settled());
        assert!(tx.recurring);
    }

    #[test]
    fn deserialize_minimal_transaction() {
        let json = r#"{"id": "t-2", "kind": "income", "amount": 10.5}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.account_id, AccountId::from("c1"));
        assert_eq!(tx.due_date, None);
        assert_eq!(tx.installment, None);
    }

    #[test]
    fn deserialize_legacy_field_names() {
        let json = r#"{
            "id": "t-3",
            "tipo": "despesa",
            "valor": 99.9,
            "data_prevista": "2024-01-10",
            "data_efetiva": "2024-01-11",
            "conta_id": "c2",
            "excluido": true
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.settled_on(), Some(date(2024, 1, 11)));
        assert_eq!(tx.account_id, AccountId::from("c2"));
        assert!(tx.deleted);
    }

    #[test]
    fn unreadable_due_date_still_loads() {
        let json = r#"{"id": "t-4", "kind": "expense", "amount": 1, "due_date": "someday"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.due(), None);
        assert_eq!(tx.status_on(date(2024, 1, 1)), Status::Planned);
    }

    #[test]
    fn empty_settled_date_is_not_settled() {
        let mut tx = Transaction::new(
            TransactionId::from("t-5"),
            TransactionKind::Expense,
            Decimal::ONE,
            date(2024, 1, 1),
            AccountId::from("c1"),
        );
        tx.settled_date = Some(String::new());
        assert!(!tx.is_settled());
    }

    #[test]
    fn signed_amount_follows_kind() {
        let mut tx = Transaction::new(
            TransactionId::from("t-6"),
            TransactionKind::Expense,
            "25.00".parse().unwrap(),
            date(2024, 1, 1),
            AccountId::from("c1"),
        );
        assert_eq!(tx.signed_amount(), "-25.00".parse::<Decimal>().unwrap());
        tx.kind = TransactionKind::Income;
        assert_eq!(tx.signed_amount(), "25.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn reference_date_prefers_settled() {
        let mut tx = Transaction::new(
            TransactionId::from("t-7"),
            TransactionKind::Income,
            Decimal::TEN,
            date(2024, 2, 1),
            AccountId::from("c1"),
        );
        assert_eq!(tx.reference_date(), Some(date(2024, 2, 1)));
        tx.settled_date = Some("2024-02-03".to_owned());
        assert_eq!(tx.reference_date(), Some(date(2024, 2, 3)));
    }

    #[test]
    fn serialize_roundtrip() {
        let tx = Transaction::new(
            TransactionId::from("t-8"),
            TransactionKind::Expense,
            "33.34".parse().unwrap(),
            date(2024, 5, 31),
            AccountId::from("c1"),
        );
        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, tx);
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let json = r#"{"id": "t-9", "kind": "expense", "amount": 5, "pessoa_id": "u7", "tags": ["a"]}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.extra.get("pessoa_id"), Some(&Value::from("u7")));
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["pessoa_id"], "u7");
        assert_eq!(value["tags"], serde_json::json!(["a"]));
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn cent_amounts_keep_their_value() {
        for raw in ["1999.99", "0.01", "123456789.45", "33.34"] {
            let mut tx = Transaction::new(
                TransactionId::from("t-10"),
                TransactionKind::Income,
                raw.parse().unwrap(),
                date(2024, 1, 1),
                AccountId::from("c1"),
            );
            tx.description = raw.to_owned();
            let text = serde_json::to_string(&tx).unwrap();
            let back: Transaction = serde_json::from_str(&text).unwrap();
            assert_eq!(back.amount, raw.parse::<Decimal>().unwrap(), "{raw}");
        }
    }
}
