//! Account model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AccountId, default_true};

/// Currency assumed when an account does not name one.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Account kind assumed when an account does not name one.
const DEFAULT_KIND: &str = "bank";

/// A place money is held (bank account, wallet, card).
///
/// The balance is never stored: it is computed from `initial_balance`
/// and the settled transactions that reference the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Display name.
    #[serde(alias = "nome")]
    pub name: String,
    /// Free-form kind (`bank`, `cash`, `card`, ...).
    #[serde(default = "default_kind", alias = "tipo")]
    pub kind: String,
    /// ISO currency code.
    #[serde(default = "default_currency", alias = "moeda")]
    pub currency: String,
    /// Balance before any recorded transaction.
    #[serde(
        default,
        with = "rust_decimal::serde::float",
        alias = "saldo_inicial"
    )]
    pub initial_balance: Decimal,
    /// Whether the account is offered for new transactions.
    #[serde(default = "default_true", alias = "ativo")]
    pub active: bool,
    /// Fields not modelled here, kept so rewrites preserve them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Serde default for [`Account::kind`].
fn default_kind() -> String {
    DEFAULT_KIND.to_owned()
}

/// Serde default for [`Account::currency`].
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_account_fills_defaults() {
        let account: Account = serde_json::from_str(r#"{"id": "c1", "name": "Wallet"}"#).unwrap();
        assert_eq!(account.kind, "bank");
        assert_eq!(account.currency, "BRL");
        assert_eq!(account.initial_balance, Decimal::ZERO);
        assert!(account.active);
    }

    #[test]
    fn deserialize_legacy_field_names() {
        let json = r#"{
            "id": "c1",
            "nome": "Conta Corrente",
            "tipo": "banco",
            "moeda": "BRL",
            "saldo_inicial": 1500.5
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.name, "Conta Corrente");
        assert_eq!(account.kind, "banco");
        assert_eq!(account.initial_balance, "1500.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn initial_balance_serializes_as_number() {
        let account = Account {
            id: AccountId::from("c1"),
            name: "Checking".to_owned(),
            kind: "bank".to_owned(),
            currency: "BRL".to_owned(),
            initial_balance: "1000.25".parse().unwrap(),
            active: true,
            extra: Map::new(),
        };
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["initial_balance"], serde_json::json!(1000.25));
    }

    #[test]
    fn missing_name_is_rejected() {
        let result = serde_json::from_str::<Account>(r#"{"id": "c1"}"#);
        assert!(result.is_err());
    }
}
