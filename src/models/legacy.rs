//! Records of the per-domain collections that predate the unified
//! transaction collection.
//!
//! They are only read by the migration step in
//! [`SchemaLoader::load_all`](crate::loader::SchemaLoader::load_all) and
//! are never written back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AccountId, CategoryId, Transaction, TransactionId, TransactionKind};
use super::DEFAULT_ACCOUNT_ID;
use super::transaction::FIELD_KEYS;

/// Statuses that mark a legacy record as still open.
const OPEN_STATUSES: &[&str] = &[
    "planned",
    "prevista",
    "previsto",
    "pending",
    "pendente",
    "open",
    "em_aberto",
    "overdue",
    "atrasada",
    "atrasado",
];

/// Statuses that mark a legacy bill as paid or received.
const PAID_STATUSES: &[&str] = &[
    "paid",
    "paga",
    "pago",
    "received",
    "recebida",
    "recebido",
    "settled",
    "quitada",
    "baixada",
];

/// Whether `status`, ignoring case and padding, is one of `set`.
fn status_in(status: Option<&str>, set: &[&str]) -> bool {
    status.is_some_and(|raw| {
        let normalized = raw.trim().to_lowercase();
        set.contains(&normalized.as_str())
    })
}

/// Unmodelled legacy fields that can ride along on a transaction without
/// colliding with one of its own keys.
fn carried_extra(extra: &Map<String, Value>) -> Map<String, Value> {
    extra
        .iter()
        .filter(|&(key, _)| !FIELD_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// An entry of the legacy expense or income collection.
///
/// These were recorded when the money moved, so they are treated as
/// settled unless their status says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEntry {
    /// Original identifier, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// Date the money moved.
    #[serde(default, alias = "data")]
    pub date: Option<String>,
    /// Amount moved.
    #[serde(with = "rust_decimal::serde::float", alias = "valor")]
    pub amount: Decimal,
    /// Category reference.
    #[serde(default, alias = "categoria_id")]
    pub category_id: Option<CategoryId>,
    /// Account reference.
    #[serde(default, alias = "conta_id")]
    pub account_id: Option<AccountId>,
    /// Free-text note.
    #[serde(default, alias = "observacoes", alias = "description", alias = "descricao")]
    pub note: Option<String>,
    /// Free-text status.
    #[serde(default)]
    pub status: Option<String>,
    /// How the entry was paid.
    #[serde(default, alias = "forma_pagamento")]
    pub settlement_method: Option<String>,
    /// Remaining fields, carried onto the migrated transaction.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LegacyEntry {
    /// Whether the entry's status marks it as not yet realized.
    #[must_use]
    pub fn is_open(&self) -> bool {
        status_in(self.status.as_deref(), OPEN_STATUSES)
    }

    /// Maps the entry into the unified shape with the given direction
    /// and identifier.
    #[must_use]
    pub fn to_transaction(&self, kind: TransactionKind, id: TransactionId) -> Transaction {
        let settled_date = if self.is_open() {
            None
        } else {
            self.date.clone()
        };
        Transaction {
            id,
            code: None,
            kind,
            description: self.note.clone().unwrap_or_default(),
            amount: self.amount.abs(),
            due_date: self.date.clone(),
            settled_date,
            settlement_method: self.settlement_method.clone(),
            account_id: self
                .account_id
                .clone()
                .unwrap_or_else(|| AccountId::from(DEFAULT_ACCOUNT_ID)),
            category_id: self.category_id.clone(),
            deleted: false,
            deleted_at: None,
            installment: None,
            recurring: false,
            updated_at: None,
            extra: carried_extra(&self.extra),
        }
    }
}

/// An entry of the legacy payable or receivable collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyBill {
    /// Original identifier, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// Free-text description.
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
    /// Amount owed.
    #[serde(with = "rust_decimal::serde::float", alias = "valor")]
    pub amount: Decimal,
    /// Payable due date.
    #[serde(default, alias = "vencimento")]
    pub due_date: Option<String>,
    /// Receivable expected date.
    #[serde(default, alias = "previsto")]
    pub expected_date: Option<String>,
    /// Free-text status.
    #[serde(default)]
    pub status: Option<String>,
    /// Payment or receipt date.
    #[serde(
        default,
        alias = "paga_em",
        alias = "pago_em",
        alias = "recebido_em",
        alias = "data_pagamento"
    )]
    pub settled_date: Option<String>,
    /// Category reference.
    #[serde(default, alias = "categoria_id")]
    pub category_id: Option<CategoryId>,
    /// Account reference.
    #[serde(default, alias = "conta_id")]
    pub account_id: Option<AccountId>,
    /// Remaining fields, carried onto the migrated transaction.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LegacyBill {
    /// Whether the bill was paid or received.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        status_in(self.status.as_deref(), PAID_STATUSES)
            || self
                .settled_date
                .as_deref()
                .is_some_and(|raw| !raw.trim().is_empty())
    }

    /// Maps the bill into the unified shape. Payables become expenses due
    /// on `vencimento`, receivables become incomes due on `previsto`.
    #[must_use]
    pub fn to_transaction(&self, kind: TransactionKind, id: TransactionId) -> Transaction {
        let due_date = match kind {
            TransactionKind::Expense => self.due_date.clone().or_else(|| self.expected_date.clone()),
            TransactionKind::Income => self.expected_date.clone().or_else(|| self.due_date.clone()),
        };
        let settled_date = if self.is_paid() {
            self.settled_date
                .clone()
                .filter(|raw| !raw.trim().is_empty())
                .or_else(|| due_date.clone())
        } else {
            None
        };
        Transaction {
            id,
            code: None,
            kind,
            description: self.description.clone().unwrap_or_default(),
            amount: self.amount.abs(),
            due_date,
            settled_date,
            settlement_method: None,
            account_id: self
                .account_id
                .clone()
                .unwrap_or_else(|| AccountId::from(DEFAULT_ACCOUNT_ID)),
            category_id: self.category_id.clone(),
            deleted: false,
            deleted_at: None,
            installment: None,
            recurring: false,
            updated_at: None,
            extra: carried_extra(&self.extra),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_settled_on_its_date() {
        let json = r#"{"id": "d1", "data": "2024-01-15", "valor": 50.0, "observacoes": "Lunch"}"#;
        let entry: LegacyEntry = serde_json::from_str(json).unwrap();
        let tx = entry.to_transaction(TransactionKind::Expense, TransactionId::from("d1"));
        assert_eq!(tx.due_date.as_deref(), Some("2024-01-15"));
        assert_eq!(tx.settled_date.as_deref(), Some("2024-01-15"));
        assert_eq!(tx.description, "Lunch");
        assert_eq!(tx.account_id, AccountId::from("c1"));
    }

    #[test]
    fn entry_with_planned_status_stays_open() {
        let json = r#"{"date": "2024-02-01", "amount": 10, "status": "Prevista"}"#;
        let entry: LegacyEntry = serde_json::from_str(json).unwrap();
        let tx = entry.to_transaction(TransactionKind::Income, TransactionId::from("r1"));
        assert_eq!(tx.settled_date, None);
        assert_eq!(tx.due_date.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn payable_is_due_on_vencimento() {
        let json = r#"{"descricao": "Power bill", "valor": 180.5, "vencimento": "2024-03-10", "status": "em_aberto"}"#;
        let bill: LegacyBill = serde_json::from_str(json).unwrap();
        let tx = bill.to_transaction(TransactionKind::Expense, TransactionId::from("p1"));
        assert_eq!(tx.due_date.as_deref(), Some("2024-03-10"));
        assert_eq!(tx.settled_date, None);
        assert_eq!(tx.kind, TransactionKind::Expense);
    }

    #[test]
    fn received_receivable_is_settled_on_due_date() {
        let json = r#"{"descricao": "Invoice", "valor": 900, "previsto": "2024-04-05", "status": "recebido"}"#;
        let bill: LegacyBill = serde_json::from_str(json).unwrap();
        let tx = bill.to_transaction(TransactionKind::Income, TransactionId::from("r2"));
        assert_eq!(tx.due_date.as_deref(), Some("2024-04-05"));
        assert_eq!(tx.settled_date.as_deref(), Some("2024-04-05"));
    }

    #[test]
    fn paid_bill_prefers_payment_date() {
        let json = r#"{"valor": 20, "vencimento": "2024-05-10", "paga_em": "2024-05-08"}"#;
        let bill: LegacyBill = serde_json::from_str(json).unwrap();
        assert!(bill.is_paid());
        let tx = bill.to_transaction(TransactionKind::Expense, TransactionId::from("p2"));
        assert_eq!(tx.settled_date.as_deref(), Some("2024-05-08"));
    }

    #[test]
    fn unknown_fields_ride_along() {
        let json = r#"{"id": "d2", "data": "2024-01-15", "valor": 8, "pessoa_id": "u2", "tipo": "fixa", "status": "paga"}"#;
        let entry: LegacyEntry = serde_json::from_str(json).unwrap();
        let tx = entry.to_transaction(TransactionKind::Expense, TransactionId::from("d2"));
        assert_eq!(tx.extra.get("pessoa_id"), Some(&Value::from("u2")));
        assert!(tx.extra.get("tipo").is_none());
        assert!(tx.extra.get("status").is_none());

        let json = r#"{"valor": 20, "vencimento": "2024-05-10", "fornecedor": "Power Co"}"#;
        let bill: LegacyBill = serde_json::from_str(json).unwrap();
        let tx = bill.to_transaction(TransactionKind::Expense, TransactionId::from("p3"));
        assert_eq!(tx.extra.get("fornecedor"), Some(&Value::from("Power Co")));
    }

    #[test]
    fn bill_without_amount_is_rejected() {
        let result = serde_json::from_str::<LegacyBill>(r#"{"vencimento": "2024-05-10"}"#);
        assert!(result.is_err());
    }
}
