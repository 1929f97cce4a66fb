//! Document paths, default shapes, and the pure normalisation passes run
//! on every load.
//!
//! Nothing here performs I/O: each pass takes a document and reports
//! whether it changed, and [`SchemaLoader`](crate::loader::SchemaLoader)
//! decides what to write.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::engine::records::new_id;
use crate::models::{
    Budget, Category, Goal, LegacyBill, LegacyEntry, Transaction, TransactionId, TransactionKind,
};

/// A document the ledger knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentPath {
    /// `data/usuarios.json`
    Users,
    /// `data/contas.json`
    Accounts,
    /// `data/categorias.json`
    Categories,
    /// `data/transacoes.json`
    Transactions,
    /// `data/metas.json`
    Goals,
    /// `data/orcamentos.json`
    Budgets,
    /// `data/despesas.json`, legacy settled expenses.
    LegacyExpenses,
    /// `data/receitas.json`, legacy settled incomes.
    LegacyIncomes,
    /// `data/contas_pagar.json`, legacy bills to pay.
    LegacyPayables,
    /// `data/contas_receber.json`, legacy amounts to receive.
    LegacyReceivables,
}

impl DocumentPath {
    /// Documents loaded, created when missing, and kept in a snapshot.
    pub const CORE: [Self; 6] = [
        Self::Users,
        Self::Accounts,
        Self::Categories,
        Self::Transactions,
        Self::Goals,
        Self::Budgets,
    ];

    /// Documents read once by the migration step and never written.
    pub const LEGACY: [Self; 4] = [
        Self::LegacyExpenses,
        Self::LegacyIncomes,
        Self::LegacyPayables,
        Self::LegacyReceivables,
    ];

    /// Repository path of the document.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "data/usuarios.json",
            Self::Accounts => "data/contas.json",
            Self::Categories => "data/categorias.json",
            Self::Transactions => "data/transacoes.json",
            Self::Goals => "data/metas.json",
            Self::Budgets => "data/orcamentos.json",
            Self::LegacyExpenses => "data/despesas.json",
            Self::LegacyIncomes => "data/receitas.json",
            Self::LegacyPayables => "data/contas_pagar.json",
            Self::LegacyReceivables => "data/contas_receber.json",
        }
    }

    /// Whether this is one of the pre-unification collections.
    #[inline]
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(
            self,
            Self::LegacyExpenses
                | Self::LegacyIncomes
                | Self::LegacyPayables
                | Self::LegacyReceivables
        )
    }

    /// Whether records in this collection carry a sequence code.
    #[inline]
    #[must_use]
    pub const fn has_codes(self) -> bool {
        matches!(self, Self::Transactions | Self::Categories)
    }

    /// Content written when the document does not exist yet.
    #[must_use]
    pub fn default_content(self) -> Value {
        match self {
            Self::Users => json!([
                {"id": "u1", "name": "Admin", "role": "admin"}
            ]),
            Self::Accounts => json!([
                {
                    "id": "c1",
                    "name": "Checking Account",
                    "kind": "bank",
                    "currency": "BRL",
                    "initial_balance": 0.0_f64,
                    "active": true
                }
            ]),
            Self::Categories => json!([
                {"id": "cr1", "code": 1_u32, "name": "Salary", "kind": "income"},
                {"id": "cr2", "code": 2_u32, "name": "Freelance", "kind": "income"},
                {"id": "cr3", "code": 3_u32, "name": "Rent Received", "kind": "income"},
                {"id": "cd1", "code": 4_u32, "name": "Housing", "kind": "expense"},
                {"id": "cd2", "code": 5_u32, "name": "Food", "kind": "expense"},
                {"id": "cd3", "code": 6_u32, "name": "Transport", "kind": "expense"},
                {"id": "cd4", "code": 7_u32, "name": "Education", "kind": "expense"},
                {"id": "cd5", "code": 8_u32, "name": "Leisure", "kind": "expense"}
            ]),
            Self::Transactions
            | Self::Goals
            | Self::Budgets
            | Self::LegacyExpenses
            | Self::LegacyIncomes
            | Self::LegacyPayables
            | Self::LegacyReceivables => Value::Array(Vec::new()),
        }
    }
}

impl core::fmt::Display for DocumentPath {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of the grouped category shape and the kind each one holds.
const CATEGORY_GROUPS: &[(&str, TransactionKind)] = &[
    ("income", TransactionKind::Income),
    ("incomes", TransactionKind::Income),
    ("receitas", TransactionKind::Income),
    ("expense", TransactionKind::Expense),
    ("expenses", TransactionKind::Expense),
    ("despesas", TransactionKind::Expense),
];

/// Flattens `{income: [...], expense: [...]}` into one array whose entries
/// carry their `kind`. Returns `None` if `content` is not in that shape.
#[must_use]
pub fn flatten_categories(content: &Value) -> Option<Value> {
    let groups = content.as_object()?;
    if !groups.keys().any(|key| CATEGORY_GROUPS.iter().any(|&(name, _)| key == name)) {
        return None;
    }
    let mut flat = Vec::new();
    for &(name, kind) in CATEGORY_GROUPS {
        let Some(entries) = groups.get(name).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            let mut record = entry.clone();
            if let Some(fields) = record.as_object_mut()
                && !fields.contains_key("kind")
                && !fields.contains_key("tipo")
            {
                let _previous = fields.insert("kind".to_owned(), Value::from(kind.as_str()));
            }
            flat.push(record);
        }
    }
    Some(Value::Array(flat))
}

/// Decodes `entry` as `T`, or `None` if it does not fit.
fn decodes<T: DeserializeOwned>(entry: &Value) -> Option<T> {
    serde_json::from_value(entry.clone()).ok()
}

/// Whether `entry` is a structurally valid member of the collection at
/// `path`. Collections without a typed record accept everything.
#[must_use]
pub fn is_valid_entry(path: DocumentPath, entry: &Value) -> bool {
    match path {
        DocumentPath::Transactions => {
            decodes::<Transaction>(entry).is_some_and(|tx| tx.amount >= Decimal::ZERO)
        }
        DocumentPath::Categories => {
            decodes::<Category>(entry).is_some_and(|cat| !cat.name.trim().is_empty())
        }
        DocumentPath::Goals => {
            decodes::<Goal>(entry).is_some_and(|goal| goal.target_amount >= Decimal::ZERO)
        }
        DocumentPath::Budgets => {
            decodes::<Budget>(entry).is_some_and(|budget| budget.monthly_limit >= Decimal::ZERO)
        }
        DocumentPath::Users
        | DocumentPath::Accounts
        | DocumentPath::LegacyExpenses
        | DocumentPath::LegacyIncomes
        | DocumentPath::LegacyPayables
        | DocumentPath::LegacyReceivables => true,
    }
}

/// Gives every budget without an id a fresh one. Returns whether any
/// entry changed.
fn fill_budget_ids(entries: &mut [Value]) -> bool {
    let mut changed = false;
    for fields in entries.iter_mut().filter_map(Value::as_object_mut) {
        let missing = fields
            .get("id")
            .is_none_or(|id| id.as_str().is_none_or(|raw| raw.trim().is_empty()));
        if missing {
            let _previous = fields.insert("id".to_owned(), Value::from(new_id("o")));
            changed = true;
        }
    }
    changed
}

/// Sanitises one collection document.
///
/// Grouped categories are flattened, budgets lacking an id receive one,
/// and entries that are not valid records are dropped. Kept entries are
/// passed through untouched. The flag tells whether the document must be
/// written back; it is `false` for an already-clean document.
///
/// A document that is not an array (after flattening) is returned as is.
#[must_use]
pub fn sanitize_collection(path: DocumentPath, content: Value) -> (Value, bool) {
    let flattened = if path == DocumentPath::Categories {
        flatten_categories(&content)
    } else {
        None
    };
    let mut changed = flattened.is_some();
    let mut document = flattened.unwrap_or(content);
    let Some(entries) = document.as_array_mut() else {
        tracing::warn!(%path, "collection is not an array, skipping sanitation");
        return (document, changed);
    };
    if path == DocumentPath::Budgets {
        changed |= fill_budget_ids(entries);
    }
    let before = entries.len();
    entries.retain(|entry| {
        let keep = is_valid_entry(path, entry);
        if !keep {
            tracing::warn!(%path, %entry, "dropping invalid entry");
        }
        keep
    });
    changed |= entries.len() != before;
    (document, changed)
}

/// Reads the sequence code of an entry, accepting the older `codigo` key.
fn entry_code(fields: &Map<String, Value>) -> Option<u32> {
    fields
        .get("code")
        .or_else(|| fields.get("codigo"))
        .and_then(Value::as_u64)
        .filter(|code| *code > 0)
        .and_then(|code| u32::try_from(code).ok())
}

/// Assigns unique positive codes in a coded collection.
///
/// Codes continue from the largest valid code present. An entry with no
/// valid code, or repeating a code seen earlier in the list, receives the
/// next one. A kept code stored under `codigo` moves to `code`. Returns
/// whether any entry changed.
pub fn assign_codes(content: &mut Value) -> bool {
    let Some(entries) = content.as_array_mut() else {
        return false;
    };
    let mut next = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(entry_code)
        .max()
        .unwrap_or(0);
    let mut seen = HashSet::new();
    let mut changed = false;
    for fields in entries.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(code) = entry_code(fields)
            && seen.insert(code)
        {
            if fields.remove("codigo").is_some() {
                let _previous = fields.insert("code".to_owned(), Value::from(code));
                changed = true;
            }
            continue;
        }
        next += 1;
        let _codigo = fields.remove("codigo");
        let _previous = fields.insert("code".to_owned(), Value::from(next));
        let _fresh = seen.insert(next);
        changed = true;
    }
    changed
}

/// Decodes the array members of a document, skipping anything that does
/// not decode.
#[must_use]
pub fn decode_entries<T: DeserializeOwned>(path: DocumentPath, content: &Value) -> Vec<T> {
    let Some(entries) = content.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(%path, %error, "skipping undecodable entry");
                None
            }
        })
        .collect()
}

/// The four legacy collections, as read from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyCollections {
    /// Settled expenses.
    pub expenses: Value,
    /// Settled incomes.
    pub incomes: Value,
    /// Bills to pay.
    pub payables: Value,
    /// Amounts to receive.
    pub receivables: Value,
}

/// Maps the legacy collections into unified transactions.
///
/// Expenses come first, then incomes, payables, and receivables. Records
/// keep their legacy id unless it is missing or already used, in which
/// case they get a fresh one.
#[must_use]
pub fn migrate_legacy(legacy: &LegacyCollections) -> Vec<Transaction> {
    let mut used = HashSet::<String>::new();
    let mut next_id = |legacy_id: Option<&str>| {
        let id = legacy_id
            .map(str::trim)
            .filter(|raw| !raw.is_empty() && !used.contains(*raw))
            .map_or_else(|| new_id("t"), str::to_owned);
        let _fresh = used.insert(id.clone());
        TransactionId::new(id)
    };

    let mut migrated = Vec::new();
    let entries = [
        (DocumentPath::LegacyExpenses, &legacy.expenses, TransactionKind::Expense),
        (DocumentPath::LegacyIncomes, &legacy.incomes, TransactionKind::Income),
    ];
    for (path, content, kind) in entries {
        for entry in decode_entries::<LegacyEntry>(path, content) {
            let id = next_id(entry.id.as_deref());
            migrated.push(entry.to_transaction(kind, id));
        }
    }
    let bills = [
        (DocumentPath::LegacyPayables, &legacy.payables, TransactionKind::Expense),
        (DocumentPath::LegacyReceivables, &legacy.receivables, TransactionKind::Income),
    ];
    for (path, content, kind) in bills {
        for bill in decode_entries::<LegacyBill>(path, content) {
            let id = next_id(bill.id.as_deref());
            migrated.push(bill.to_transaction(kind, id));
        }
    }
    migrated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_and_defaults() {
        assert_eq!(DocumentPath::Transactions.as_str(), "data/transacoes.json");
        assert_eq!(DocumentPath::LegacyExpenses.as_str(), "data/despesas.json");
        assert_eq!(DocumentPath::LegacyPayables.to_string(), "data/contas_pagar.json");
        assert_eq!(DocumentPath::LegacyReceivables.to_string(), "data/contas_receber.json");
        assert!(DocumentPath::LEGACY.iter().all(|path| path.is_legacy()));
        assert!(!DocumentPath::CORE.iter().any(|path| path.is_legacy()));

        let users = DocumentPath::Users.default_content();
        assert_eq!(users[0]["role"], "admin");
        let cats: Vec<Category> =
            decode_entries(DocumentPath::Categories, &DocumentPath::Categories.default_content());
        assert_eq!(cats.len(), 8);
        assert_eq!(
            cats.iter().filter(|cat| cat.kind == TransactionKind::Income).count(),
            3
        );
        assert_eq!(DocumentPath::Goals.default_content(), json!([]));
    }

    #[test]
    fn defaults_are_already_clean() {
        for path in DocumentPath::CORE {
            let (_, changed) = sanitize_collection(path, path.default_content());
            assert!(!changed, "{path}");
            let mut content = path.default_content();
            assert!(!(path.has_codes() && assign_codes(&mut content)), "{path}");
        }
    }

    #[test]
    fn drops_invalid_transactions() {
        let content = json!([
            {"id": "t1", "kind": "expense", "amount": 10.0, "due_date": "2024-01-01"},
            {"id": "t2", "kind": "expense", "amount": -5.0},
            {"id": "t3", "kind": "sideways", "amount": 1.0},
            "not a record",
            42
        ]);
        let (clean, changed) = sanitize_collection(DocumentPath::Transactions, content);
        assert!(changed);
        assert_eq!(clean.as_array().unwrap().len(), 1);
        assert_eq!(clean[0]["id"], "t1");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let content = json!([
            {"id": "g1", "name": "Trip", "target_amount": 100.0},
            {"name": "no id"}
        ]);
        let (once, first) = sanitize_collection(DocumentPath::Goals, content);
        assert!(first);
        let (twice, second) = sanitize_collection(DocumentPath::Goals, once.clone());
        assert!(!second);
        assert_eq!(once, twice);
    }

    #[test]
    fn flattens_grouped_categories() {
        let grouped = json!({
            "receitas": [{"id": "cr1", "nome": "Salary"}],
            "despesas": [{"id": "cd1", "nome": "Food"}, {"id": "cd2"}]
        });
        let (flat, changed) = sanitize_collection(DocumentPath::Categories, grouped);
        assert!(changed);
        let cats: Vec<Category> = decode_entries(DocumentPath::Categories, &flat);
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].kind, TransactionKind::Income);
        assert_eq!(cats[1].kind, TransactionKind::Expense);
        assert_eq!(flatten_categories(&json!([])), None);
        assert_eq!(flatten_categories(&json!({"other": []})), None);
    }

    #[test]
    fn budgets_without_id_get_one() {
        let content = json!([
            {"category_id": "cd1", "monthly_limit": 300.0},
            {"id": "", "category_id": "cd2", "monthly_limit": 50.0},
            {"id": "o1", "category_id": "cd3", "monthly_limit": 10.0}
        ]);
        let (clean, changed) = sanitize_collection(DocumentPath::Budgets, content);
        assert!(changed);
        let budgets: Vec<Budget> = decode_entries(DocumentPath::Budgets, &clean);
        assert_eq!(budgets.len(), 3);
        assert!(budgets.iter().all(|budget| !budget.id.as_inner().is_empty()));
        assert_ne!(budgets[0].id, budgets[1].id);
        let (_, again) = sanitize_collection(DocumentPath::Budgets, clean);
        assert!(!again);
    }

    #[test]
    fn non_array_is_left_alone() {
        let (content, changed) = sanitize_collection(DocumentPath::Goals, json!({"x": 1}));
        assert!(!changed);
        assert_eq!(content, json!({"x": 1}));
    }

    #[test]
    fn codes_continue_from_max_and_fix_duplicates() {
        let mut content = json!([
            {"id": "a", "code": 7},
            {"id": "b"},
            {"id": "c", "code": 7},
            {"id": "d", "codigo": 2},
            {"id": "e", "code": "x"}
        ]);
        assert!(assign_codes(&mut content));
        let codes: Vec<u64> = content
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["code"].as_u64().unwrap())
            .collect();
        assert_eq!(codes, vec![7, 8, 9, 2, 10]);
        assert!(content[3].get("codigo").is_none());
        assert!(!assign_codes(&mut content));
    }

    #[test]
    fn older_code_key_is_renamed_once() {
        let mut content = json!([{"id": "a", "codigo": 3}, {"id": "b", "code": 4}]);
        assert!(assign_codes(&mut content));
        assert_eq!(content, json!([{"id": "a", "code": 3}, {"id": "b", "code": 4}]));
        assert!(!assign_codes(&mut content));
    }

    #[test]
    fn migrates_all_legacy_shapes() {
        let legacy = LegacyCollections {
            expenses: json!([
                {"id": "x1", "data": "2024-01-05", "valor": 50.0, "observacoes": "Market"},
                {"id": "x1", "data": "2024-01-06", "valor": 20.0, "status": "prevista"}
            ]),
            incomes: json!([{"id": "i1", "date": "2024-01-01", "amount": 3000.0}]),
            payables: json!([
                {"id": "p1", "descricao": "Power", "valor": 120.0, "vencimento": "2024-01-10",
                 "status": "paga", "paga_em": "2024-01-09"},
                {"id": "p2", "descricao": "Water", "valor": 40.0, "vencimento": "2024-01-20",
                 "status": "pendente"}
            ]),
            receivables: json!([
                {"descricao": "Client", "valor": 900.0, "previsto": "2024-01-25", "status": "recebido"}
            ]),
        };
        let txs = migrate_legacy(&legacy);
        assert_eq!(txs.len(), 6);

        assert_eq!(txs[0].id, TransactionId::from("x1"));
        assert_eq!(txs[0].settled_date.as_deref(), Some("2024-01-05"));
        assert_ne!(txs[1].id, TransactionId::from("x1"));
        assert!(!txs[1].is_settled());
        assert_eq!(txs[2].kind, TransactionKind::Income);

        assert_eq!(txs[3].kind, TransactionKind::Expense);
        assert_eq!(txs[3].due_date.as_deref(), Some("2024-01-10"));
        assert_eq!(txs[3].settled_date.as_deref(), Some("2024-01-09"));
        assert!(!txs[4].is_settled());

        assert_eq!(txs[5].kind, TransactionKind::Income);
        assert_eq!(txs[5].due_date.as_deref(), Some("2024-01-25"));
        assert_eq!(txs[5].settled_date.as_deref(), Some("2024-01-25"));

        let ids: HashSet<&TransactionId> = txs.iter().map(|tx| &tx.id).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn migration_of_empty_legacy_is_empty() {
        let legacy = LegacyCollections {
            expenses: json!([]),
            incomes: Value::Null,
            payables: json!({"not": "an array"}),
            receivables: json!([]),
        };
        assert!(migrate_legacy(&legacy).is_empty());
    }
}
