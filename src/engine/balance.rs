//! Per-account balance aggregation.

use rust_decimal::Decimal;

use crate::models::{Account, AccountId, Transaction};

/// Balance of `account`: its initial balance plus the signed amount of
/// every settled, non-deleted transaction on it.
#[must_use]
pub fn account_balance(account: &Account, transactions: &[Transaction]) -> Decimal {
    account.initial_balance + settled_total(&account.id, transactions)
}

/// Sum of signed settled, non-deleted amounts on `account_id`.
#[must_use]
pub fn settled_total(account_id: &AccountId, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.account_id == *account_id && !tx.deleted && tx.is_settled())
        .map(Transaction::signed_amount)
        .sum()
}

/// Balances of every active account, in collection order.
#[must_use]
pub fn balances<'acc>(
    accounts: &'acc [Account],
    transactions: &[Transaction],
) -> Vec<(&'acc Account, Decimal)> {
    accounts
        .iter()
        .filter(|account| account.active)
        .map(|account| (account, account_balance(account, transactions)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{TransactionId, TransactionKind};

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn account(id: &str, initial: &str) -> Account {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Checking",
            "initial_balance": initial.parse::<f64>().unwrap(),
        }))
        .unwrap()
    }

    fn tx(id: &str, kind: TransactionKind, amount: &str, settled: bool) -> Transaction {
        let mut tx = Transaction::new(
            TransactionId::from(id),
            kind,
            dec(amount),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            AccountId::from("c1"),
        );
        if settled {
            tx.settled_date = Some("2024-05-01".to_owned());
        }
        tx
    }

    #[test]
    fn settled_expense_reduces_balance_unsettled_does_not() {
        let acc = account("c1", "1000.00");
        let list = vec![
            tx("a", TransactionKind::Expense, "250.00", true),
            tx("b", TransactionKind::Expense, "400.00", false),
        ];
        assert_eq!(account_balance(&acc, &list), dec("750.00"));
    }

    #[test]
    fn income_adds_and_deleted_is_ignored() {
        let acc = account("c1", "0");
        let mut deleted = tx("d", TransactionKind::Income, "999.99", true);
        deleted.deleted = true;
        let list = vec![
            tx("a", TransactionKind::Income, "120.10", true),
            tx("b", TransactionKind::Expense, "20.05", true),
            deleted,
        ];
        assert_eq!(account_balance(&acc, &list), dec("100.05"));
    }

    #[test]
    fn other_accounts_are_ignored() {
        let acc = account("c2", "50");
        let list = vec![tx("a", TransactionKind::Expense, "10", true)];
        assert_eq!(account_balance(&acc, &list), dec("50"));
    }

    #[test]
    fn adding_unsettled_never_changes_balance() {
        let acc = account("c1", "10.00");
        let mut list = vec![tx("a", TransactionKind::Income, "5.00", true)];
        let before = account_balance(&acc, &list);
        for (i, kind) in [TransactionKind::Income, TransactionKind::Expense].into_iter().enumerate() {
            list.push(tx(&format!("u{i}"), kind, "1234.56", false));
            assert_eq!(account_balance(&acc, &list), before);
        }
    }

    #[test]
    fn balances_skip_inactive_accounts() {
        let mut closed = account("c2", "5");
        closed.active = false;
        let accounts = vec![account("c1", "1"), closed];
        let result = balances(&accounts, &[]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1, dec("1"));
    }
}
