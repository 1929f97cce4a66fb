//! CLI binary for smoke-testing a ledger repository.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike as _, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize as _;
use repo_ledger::config::{ConnectionConfig, ConnectionKey, RetryPolicy};
use repo_ledger::engine::balance::balances;
use repo_ledger::engine::budgets::budget_usage;
use repo_ledger::engine::goals::{progress, suggested_monthly_contribution};
use repo_ledger::engine::permissions::require_admin;
use repo_ledger::engine::records::{create_numbered, edit, new_id, soft_delete};
use repo_ledger::engine::status::today;
use repo_ledger::engine::{TransactionFilter, generate_installments, settle, unsettle};
use repo_ledger::models::{
    Account, AccountId, Budget, Category, CategoryId, Goal, Status, Transaction, TransactionId,
    TransactionKind, UserId,
};
use repo_ledger::schema::DocumentPath;
use repo_ledger::storage::{DocumentBackend, FileBackend};
use repo_ledger::{DocumentStore, LedgerError, SchemaLoader, Snapshot};
use rust_decimal::Decimal;

/// Ledger CLI: inspect and edit finance documents kept in a repository.
///
/// Connects to the repository named by `REPO_LEDGER_REPOSITORY` with
/// `REPO_LEDGER_TOKEN` unless `--data-dir` points at a local directory.
#[derive(Debug, Parser)]
#[command(name = "ledger", version, about)]
struct Cli {
    /// Use a local directory of JSON documents instead of the repository.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// User id named in commits; must be an admin to change records.
    #[arg(long, global = true, default_value = "u1")]
    user: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Load every document and show its size and version.
    Load,
    /// List active accounts with their balances.
    Accounts,
    /// List transactions with their derived status.
    Transactions(TransactionArgs),
    /// Create an installment group.
    Installments(InstallmentArgs),
    /// Mark a transaction as settled today.
    Settle {
        /// Transaction id or code.
        target: String,
        /// Settlement method, such as `pix` or `card`.
        #[arg(long)]
        method: Option<String>,
    },
    /// Clear the settlement of a transaction.
    Unsettle {
        /// Transaction id or code.
        target: String,
    },
    /// Soft-delete a transaction.
    Delete {
        /// Transaction id or code.
        target: String,
    },
    /// List savings goals and their progress.
    Goals,
    /// Show budget usage for a month.
    Budgets {
        /// Month to report (YYYY-MM, default: current month).
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },
}

/// Direction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// Money leaving an account.
    Expense,
    /// Money entering an account.
    Income,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Expense => Self::Expense,
            KindArg::Income => Self::Income,
        }
    }
}

/// Status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    /// Has a settled date.
    Settled,
    /// Due before today.
    Overdue,
    /// Due today.
    DueToday,
    /// Due after today.
    Planned,
}

impl From<StatusArg> for Status {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Settled => Self::Settled,
            StatusArg::Overdue => Self::Overdue,
            StatusArg::DueToday => Self::DueToday,
            StatusArg::Planned => Self::Planned,
        }
    }
}

/// Arguments for the `transactions` subcommand.
#[derive(Debug, Default, Args)]
struct TransactionArgs {
    /// Start date (inclusive, YYYY-MM-DD). Requires --to.
    #[arg(long, requires = "to", value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD). Requires --from.
    #[arg(long, requires = "from", value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Filter by account id.
    #[arg(long)]
    account: Option<String>,
    /// Filter by category id.
    #[arg(long)]
    category: Option<String>,
    /// Filter by direction.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
    /// Filter by derived status.
    #[arg(long, value_enum)]
    status: Option<StatusArg>,
    /// Filter by description (case-insensitive substring match).
    #[arg(long)]
    search: Option<String>,
    /// Minimum amount.
    #[arg(long)]
    min_amount: Option<Decimal>,
    /// Maximum amount.
    #[arg(long)]
    max_amount: Option<Decimal>,
    /// Include soft-deleted transactions.
    #[arg(long)]
    include_deleted: bool,
}

/// Arguments for the `installments` subcommand.
#[derive(Debug, Args)]
struct InstallmentArgs {
    /// Description shared by every installment.
    description: String,
    /// Total amount to split.
    amount: Decimal,
    /// Number of installments.
    #[arg(long, default_value_t = 2)]
    count: u32,
    /// Due date of the first installment (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    due: NaiveDate,
    /// Months between installments.
    #[arg(long, default_value_t = 1)]
    step: u32,
    /// Direction.
    #[arg(long, value_enum, default_value_t = KindArg::Expense)]
    kind: KindArg,
    /// Account id.
    #[arg(long, default_value = "c1")]
    account: String,
    /// Category id.
    #[arg(long)]
    category: Option<String>,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a month string in `YYYY-MM` format for clap.
fn parse_month(s: &str) -> Result<(i32, u32), String> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map(|date| (date.year(), date.month()))
        .map_err(|err| format!("{err}"))
}

/// Loader bound to one connection and acting user.
#[derive(Debug)]
struct Ledger<B> {
    /// Document loader.
    loader: SchemaLoader<B>,
    /// Cache key of the connection.
    key: ConnectionKey,
    /// Acting user.
    user: UserId,
}

impl<B: DocumentBackend> Ledger<B> {
    /// Creates a ledger that commits as `user`.
    fn new(store: DocumentStore<B>, key: ConnectionKey, user: UserId) -> Self {
        Self {
            loader: SchemaLoader::new(store).with_author(user.clone()),
            key,
            user,
        }
    }

    /// Loads the current snapshot.
    fn load(&self) -> repo_ledger::Result<Snapshot> {
        self.loader.load_all(&self.key)
    }

    /// Loads the transactions, checks the acting user is an admin, applies
    /// `apply`, and saves the collection.
    fn edit_transactions<F>(&self, message: &str, apply: F) -> repo_ledger::Result<()>
    where
        F: FnOnce(&mut Vec<Transaction>) -> repo_ledger::Result<()>,
    {
        let mut snapshot = self.load()?;
        require_admin(snapshot.user(&self.user).as_ref())?;
        let mut txs = snapshot.transactions();
        apply(&mut txs)?;
        let _version = self.loader.save_collection(
            &mut snapshot,
            DocumentPath::Transactions,
            &txs,
            message,
        )?;
        Ok(())
    }
}

/// Finds a non-deleted transaction by id, or by code when `target` is a
/// number.
fn find_target(txs: &[Transaction], target: &str) -> repo_ledger::Result<TransactionId> {
    let code = target.parse::<u32>().ok();
    txs.iter()
        .filter(|tx| !tx.deleted)
        .find(|tx| tx.id.as_inner() == target || (code.is_some() && tx.code == code))
        .map(|tx| tx.id.clone())
        .ok_or_else(|| LedgerError::InvalidArgument(format!("no transaction matches {target}")))
}

/// Builds a [`TransactionFilter`] from CLI arguments.
fn build_transaction_filter(args: &TransactionArgs) -> TransactionFilter {
    let mut filter = TransactionFilter::new();
    if let Some((from_date, to_date)) = args.from.zip(args.to) {
        filter = filter.date_range(from_date, to_date);
    }
    if let Some(account) = args.account.as_deref() {
        filter = filter.account(AccountId::from(account));
    }
    if let Some(category) = args.category.as_deref() {
        filter = filter.category(CategoryId::from(category));
    }
    if let Some(kind) = args.kind {
        filter = filter.kind(kind.into());
    }
    if let Some(status) = args.status {
        filter = filter.status(status.into());
    }
    if let Some(search) = args.search.as_deref() {
        filter = filter.description(search);
    }
    filter.min_amount = args.min_amount;
    filter.max_amount = args.max_amount;
    if args.include_deleted {
        filter = filter.include_deleted();
    }
    filter
}

/// Prints an error line and returns a failure exit code.
fn fail(context: &str, err: &LedgerError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let user = UserId::new(cli.user);

    if let Some(dir) = cli.data_dir {
        let key = ConnectionKey::new(dir.display().to_string(), "local");
        return match FileBackend::new(dir) {
            Ok(backend) => dispatch(&Ledger::new(DocumentStore::new(backend), key, user), cli.command),
            Err(err) => fail("failed to open data directory", &err),
        };
    }

    let config = match ConnectionConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            let code = fail("incomplete connection settings", &err)?;
            writeln!(
                io::stderr().lock(),
                "  {} create a .env file with REPO_LEDGER_REPOSITORY and REPO_LEDGER_TOKEN, or pass {}",
                "hint:".cyan(),
                "--data-dir".bold()
            )?;
            return Ok(code);
        }
    };
    match DocumentStore::connect(&config, RetryPolicy::default()) {
        Ok(store) => dispatch(&Ledger::new(store, config.key(), user), cli.command),
        Err(err) => fail("failed to build client", &err),
    }
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<B: DocumentBackend>(ledger: &Ledger<B>, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Load => cmd_load(ledger),
        Command::Accounts => cmd_accounts(ledger),
        Command::Transactions(args) => cmd_transactions(ledger, &args),
        Command::Installments(args) => cmd_installments(ledger, &args),
        Command::Settle { target, method } => cmd_settle(ledger, &target, method.as_deref()),
        Command::Unsettle { target } => cmd_unsettle(ledger, &target),
        Command::Delete { target } => cmd_delete(ledger, &target),
        Command::Goals => cmd_goals(ledger),
        Command::Budgets { month: chosen } => {
            let (year, month) = chosen.unwrap_or_else(|| {
                let now = today();
                (now.year(), now.month())
            });
            cmd_budgets(ledger, year, month)
        }
    }
}

/// Executes the `load` subcommand.
fn cmd_load<B: DocumentBackend>(ledger: &Ledger<B>) -> io::Result<ExitCode> {
    let spinner = make_spinner("Loading ledger documents...");
    let result = ledger.load();
    spinner.finish_and_clear();
    match result {
        Ok(snapshot) => {
            print_documents_table(&snapshot)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("load failed", &err),
    }
}

/// Executes the `accounts` subcommand.
fn cmd_accounts<B: DocumentBackend>(ledger: &Ledger<B>) -> io::Result<ExitCode> {
    match ledger.load() {
        Ok(snapshot) => {
            let accounts = snapshot.accounts();
            let rows = balances(&accounts, &snapshot.transactions());
            print_accounts_table(&rows)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read accounts", &err),
    }
}

/// Executes the `transactions` subcommand.
fn cmd_transactions<B: DocumentBackend>(
    ledger: &Ledger<B>,
    args: &TransactionArgs,
) -> io::Result<ExitCode> {
    match ledger.load() {
        Ok(snapshot) => {
            let txs = snapshot.transactions();
            let mut selected = build_transaction_filter(args).apply(&txs);
            selected.sort_by(|a, b| a.due_date.cmp(&b.due_date));
            print_transactions_table(&selected, &snapshot.categories())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read transactions", &err),
    }
}

/// Executes the `installments` subcommand.
fn cmd_installments<B: DocumentBackend>(
    ledger: &Ledger<B>,
    args: &InstallmentArgs,
) -> io::Result<ExitCode> {
    let mut base = Transaction::new(
        TransactionId::new(new_id("t")),
        args.kind.into(),
        args.amount,
        args.due,
        AccountId::from(args.account.as_str()),
    );
    base.description.clone_from(&args.description);
    base.category_id = args.category.as_deref().map(CategoryId::from);

    let message = format!("add {} installments: {}", args.count, args.description);
    let mut created = Vec::new();
    let result = ledger.edit_transactions(&message, |txs| {
        let parts = generate_installments(&base, args.count, args.step)?;
        let first = txs.len();
        create_numbered(txs, parts);
        created = txs.get(first..).map(<[Transaction]>::to_vec).unwrap_or_default();
        Ok(())
    });
    match result {
        Ok(()) => {
            let rows: Vec<&Transaction> = created.iter().collect();
            print_transactions_table(&rows, &[])?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to create installments", &err),
    }
}

/// Executes the `settle` subcommand.
fn cmd_settle<B: DocumentBackend>(
    ledger: &Ledger<B>,
    target: &str,
    method: Option<&str>,
) -> io::Result<ExitCode> {
    let result = ledger.edit_transactions(&format!("settle {target}"), |txs| {
        let id = find_target(txs, target)?;
        let _edited = edit(txs, &id, |tx| settle(tx, method));
        Ok(())
    });
    report_edit(result, "settled", target)
}

/// Executes the `unsettle` subcommand.
fn cmd_unsettle<B: DocumentBackend>(ledger: &Ledger<B>, target: &str) -> io::Result<ExitCode> {
    let result = ledger.edit_transactions(&format!("unsettle {target}"), |txs| {
        let id = find_target(txs, target)?;
        let _edited = edit(txs, &id, unsettle);
        Ok(())
    });
    report_edit(result, "unsettled", target)
}

/// Executes the `delete` subcommand.
fn cmd_delete<B: DocumentBackend>(ledger: &Ledger<B>, target: &str) -> io::Result<ExitCode> {
    let result = ledger.edit_transactions(&format!("delete {target}"), |txs| {
        let id = find_target(txs, target)?;
        let _deleted = soft_delete(txs, &id);
        Ok(())
    });
    report_edit(result, "deleted", target)
}

/// Prints the outcome of a single-record edit.
fn report_edit(result: repo_ledger::Result<()>, verb: &str, target: &str) -> io::Result<ExitCode> {
    match result {
        Ok(()) => {
            writeln!(io::stdout().lock(), "{} {target}", verb.green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail(&format!("failed to update {target}"), &err),
    }
}

/// Executes the `goals` subcommand.
fn cmd_goals<B: DocumentBackend>(ledger: &Ledger<B>) -> io::Result<ExitCode> {
    match ledger.load() {
        Ok(snapshot) => {
            print_goals_table(&snapshot.goals(), today())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read goals", &err),
    }
}

/// Executes the `budgets` subcommand.
fn cmd_budgets<B: DocumentBackend>(
    ledger: &Ledger<B>,
    year: i32,
    month: u32,
) -> io::Result<ExitCode> {
    match ledger.load() {
        Ok(snapshot) => {
            print_budgets_table(
                &snapshot.budgets(),
                &snapshot.transactions(),
                &snapshot.categories(),
                year,
                month,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read budgets", &err),
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Creates a table with the shared preset and a cyan header.
fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(
        header
            .iter()
            .map(|title| Cell::new(title).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Prints a section title with a dimmed count.
fn write_title<W: io::Write>(out: &mut W, title: &str, count: usize) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({count})").dimmed()
    )?;
    writeln!(out)
}

/// Colours an amount red when negative.
fn amount_cell(amount: Decimal) -> Cell {
    let cell = Cell::new(format!("{amount:.2}"));
    if amount.is_sign_negative() && !amount.is_zero() {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

/// Prints every loaded document with its entry count and version.
fn print_documents_table(snapshot: &Snapshot) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let mut table = new_table(&["Document", "Entries", "Version"]);
    for (path, doc) in snapshot.documents() {
        let entries = doc
            .content
            .as_array()
            .map_or_else(|| "\u{2014}".to_owned(), |items| items.len().to_string());
        _ = table.add_row(vec![
            Cell::new(path),
            Cell::new(entries),
            Cell::new(&doc.version).fg(Color::DarkGrey),
        ]);
    }
    write_title(&mut out, "Documents", snapshot.documents().count())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints accounts with their balances.
fn print_accounts_table(rows: &[(&Account, Decimal)]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "{}", "No accounts found.".dimmed())?;
        return Ok(());
    }
    let mut table = new_table(&["Name", "Kind", "Currency", "Balance"]);
    for &(account, balance) in rows {
        _ = table.add_row(vec![
            Cell::new(&account.name),
            Cell::new(&account.kind),
            Cell::new(&account.currency),
            amount_cell(balance),
        ]);
    }
    write_title(&mut out, "Active Accounts", rows.len())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints transactions with their derived status.
fn print_transactions_table(txs: &[&Transaction], categories: &[Category]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }
    let mut table = new_table(&["Code", "Due", "Description", "Category", "Amount", "Status"]);
    for tx in txs {
        let code = tx
            .code
            .map_or_else(|| "\u{2014}".to_owned(), |code| code.to_string());
        let category = tx
            .category_id
            .as_ref()
            .and_then(|id| categories.iter().find(|cat| cat.id == *id))
            .map_or_else(
                || tx.category_id.as_ref().map(ToString::to_string).unwrap_or_default(),
                |cat| cat.name.clone(),
            );
        let amount = Cell::new(format!("{:.2}", tx.amount)).fg(match tx.kind {
            TransactionKind::Expense => Color::Red,
            TransactionKind::Income => Color::Green,
        });
        let status = tx.status();
        let status_cell = Cell::new(status.label()).fg(match status {
            Status::Settled => Color::DarkGrey,
            Status::Overdue => Color::Red,
            Status::DueToday => Color::Yellow,
            Status::Planned => Color::Blue,
        });
        let mut description = tx.description.clone();
        if let Some(part) = tx.installment.as_ref() {
            description = format!("{description} ({}/{})", part.index, part.total);
        }
        _ = table.add_row(vec![
            Cell::new(code),
            Cell::new(tx.due_date.as_deref().unwrap_or("\u{2014}")),
            Cell::new(description),
            Cell::new(category),
            amount,
            status_cell,
        ]);
    }
    write_title(&mut out, "Transactions", txs.len())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints goals with progress and the suggested monthly contribution.
fn print_goals_table(goals: &[Goal], today: NaiveDate) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if goals.is_empty() {
        writeln!(out, "{}", "No goals found.".dimmed())?;
        return Ok(());
    }
    let mut table = new_table(&["Name", "Saved", "Target", "Progress", "Deadline", "Monthly"]);
    for goal in goals {
        let percent = progress(goal) * Decimal::ONE_HUNDRED;
        let monthly = suggested_monthly_contribution(goal, today)
            .map_or_else(|| "\u{2014}".to_owned(), |amount| format!("{amount:.2}"));
        let name = if goal.active {
            Cell::new(&goal.name)
        } else {
            Cell::new(&goal.name).fg(Color::DarkGrey)
        };
        _ = table.add_row(vec![
            name,
            Cell::new(format!("{:.2}", goal.accumulated_amount)),
            Cell::new(format!("{:.2}", goal.target_amount)),
            Cell::new(format!("{percent:.0}%")),
            Cell::new(goal.target_date.as_deref().unwrap_or("\u{2014}")),
            Cell::new(monthly),
        ]);
    }
    write_title(&mut out, "Goals", goals.len())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints budget usage for one month.
fn print_budgets_table(
    budgets: &[Budget],
    txs: &[Transaction],
    categories: &[Category],
    year: i32,
    month: u32,
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let usage = budget_usage(budgets, txs, year, month);
    if usage.is_empty() {
        writeln!(out, "{}", "No active budgets.".dimmed())?;
        return Ok(());
    }
    let mut table = new_table(&["Category", "Limit", "Settled", "Planned", "Remaining"]);
    for row in &usage {
        let category = categories
            .iter()
            .find(|cat| cat.id == row.category_id)
            .map_or_else(|| row.category_id.to_string(), |cat| cat.name.clone());
        _ = table.add_row(vec![
            Cell::new(category),
            Cell::new(format!("{:.2}", row.limit)),
            Cell::new(format!("{:.2}", row.settled_spent)),
            Cell::new(format!("{:.2}", row.planned_spent)),
            amount_cell(row.remaining()),
        ]);
    }
    write_title(&mut out, &format!("Budgets {year}-{month:02}"), usage.len())?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
