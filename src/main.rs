//! fintrack main entry point

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fintrack_config::{Config, CurrencyConfig, SymbolPosition};
use fintrack_core::date::{format_serial, from_day, parse_date, END_OF_DAY};
use fintrack_core::{CoreError, Ledger, TimeContext, TransactionFilter};
use fintrack_utils::{format_amount, format_percent, with_symbol};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(version = "0.1.0")]
#[command(about = "Personal finance ledger: balances, positions and net worth", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Commands that work on the ledger snapshot
#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Import a workbook or CSV file
    Import {
        file: PathBuf,
        /// Worksheet name, overriding the configuration
        #[arg(long)]
        sheet: Option<String>,
        /// Leading rows to skip, overriding the configuration
        #[arg(long)]
        header_rows: Option<usize>,
    },
    /// List transactions, newest first
    Transactions {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        item: Option<String>,
        /// External identifier
        #[arg(long)]
        id: Option<String>,
        /// Text to look for in label and item
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Delete transactions by number
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// List investments and credits
    Positions,
    /// Close an investment and compute its profitability
    Validate { id: String },
    /// Reopen a closed investment
    Invalidate { id: String },
    /// Set the monthly payment and interest rate of a credit
    CreditTerms {
        id: String,
        #[arg(long)]
        monthly: Option<f64>,
        /// Annual rate in percent
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Net worth as of a date (today by default)
    NetWorth {
        #[arg(long)]
        date: Option<String>,
    },
    /// Net worth at each month end
    History {
        /// Only the most recent months
        #[arg(long)]
        months: Option<usize>,
    },
    /// Ledger totals
    Summary,
    /// Remove every transaction and position
    Wipe {
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load configuration {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

fn init_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str())).init();
}

fn money(value: f64, currency: &CurrencyConfig) -> String {
    let formatted = format_amount(
        value,
        currency.decimal_places,
        &currency.thousands_separator,
        &currency.decimal_separator,
    );
    with_symbol(&formatted, &currency.symbol, currency.symbol_position == SymbolPosition::Before)
}

fn date_arg(name: &str, value: Option<&str>) -> Result<Option<f64>> {
    match value {
        None => Ok(None),
        Some(text) => match parse_date(text) {
            Some(serial) => Ok(Some(serial)),
            None => bail!("Invalid {} date: {}", name, text),
        },
    }
}

fn today_end() -> f64 {
    from_day(Utc::now().date_naive()) + END_OF_DAY
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;
    init_logging(&config);
    if !args.config.exists() {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }

    let rt = Runtime::new()?;
    let result = rt.block_on(run(args, config));
    if let Err(e) = &result {
        if let Some(core) = e.downcast_ref::<CoreError>() {
            core.log("command");
        }
    }
    result
}

async fn run(args: Args, config: Config) -> Result<()> {
    match args.command {
        Command::InitConfig { force } => init_config(&args.config, force),
        Command::Ledger(command) => run_ledger(command, &config).await,
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, Config::generate_default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_ledger(command: LedgerCommand, config: &Config) -> Result<()> {
    let snapshot = config.snapshot_path();
    let ledger = Ledger::open(&snapshot).context("Failed to open ledger snapshot")?;
    let date_format = config.display.date_format.as_str();
    let currency = &config.currency;
    let mut dirty = true;

    match command {
        LedgerCommand::Import { file, sheet, header_rows } => {
            let mut import = config.import.clone();
            if sheet.is_some() {
                import.sheet = sheet;
            }
            if let Some(rows) = header_rows {
                import.header_rows = rows;
            }

            let report = fintrack_import::read_file(&file, &import).await?;
            for error in &report.errors {
                eprintln!("skipped {}", error);
            }
            let summary = ledger.import(report.records).await?;
            println!(
                "Imported {} transactions ({} rows skipped); investments: {} new, {} updated; credits: {} new, {} updated",
                summary.inserted,
                report.errors.len(),
                summary.investments_inserted,
                summary.investments_updated,
                summary.credits_inserted,
                summary.credits_updated
            );
        }
        LedgerCommand::Transactions {
            from,
            to,
            category,
            item,
            id,
            search,
            page,
        } => {
            dirty = false;
            let start = date_arg("--from", from.as_deref())?;
            let end = date_arg("--to", to.as_deref())?;
            let time = if start.is_some() || end.is_some() {
                TimeContext::custom(start, end)
            } else {
                TimeContext::new(config.time_range.default_range)
            };
            println!("{}", time.description());

            let filter = TransactionFilter {
                time: Some(time),
                category,
                item,
                external_id: id,
                search,
            };
            let result = ledger.transaction_page(&filter, page, config.display.records_per_page);
            for txn in &result.transactions {
                println!(
                    "{:>6}  {:<10}  {:<20}  {:<16}  {:<30}  {:>14}  {:>14}  {}",
                    txn.id,
                    format_serial(txn.date, date_format),
                    txn.category.label(),
                    txn.item,
                    txn.label,
                    money(txn.variation, currency),
                    money(txn.balance, currency),
                    txn.external_id.as_deref().unwrap_or("")
                );
            }
            println!(
                "page {} ({} of {} transactions)",
                result.page,
                result.transactions.len(),
                result.total_count
            );
        }
        LedgerCommand::Delete { ids } => {
            let summary = ledger.delete_transactions(&ids).await?;
            println!("Deleted {} transactions", summary.removed);
        }
        LedgerCommand::Positions => {
            dirty = false;
            println!("Investments");
            for inv in ledger.investments() {
                println!(
                    "  {:<16} {:?}  since {}  invested {}  earned {}  profit {}  {} ({} / year)",
                    inv.external_id,
                    inv.status(),
                    format_serial(Some(inv.date_begin), date_format),
                    money(inv.invested, currency),
                    money(inv.earned, currency),
                    money(inv.profit(), currency),
                    format_percent(inv.profitability, 2),
                    format_percent(inv.annual_profitability, 2)
                );
            }
            println!("Credits");
            for credit in ledger.credits() {
                let months = credit
                    .months_remaining()
                    .map(|m| format!("{} months left", m))
                    .unwrap_or_default();
                println!(
                    "  {:<16} borrowed {}  reimbursed {}  remaining {}  {}  {}",
                    credit.external_id,
                    money(credit.total_amount, currency),
                    money(credit.reimbursed, currency),
                    money(credit.remaining, currency),
                    format_percent(credit.progress(), 1),
                    months
                );
            }
        }
        LedgerCommand::Validate { id } => {
            let inv = ledger.validate_investment(&id).await?;
            println!(
                "{} closed on {}: {} ({} / year)",
                inv.external_id,
                format_serial(inv.date_end, date_format),
                format_percent(inv.profitability, 2),
                format_percent(inv.annual_profitability, 2)
            );
        }
        LedgerCommand::Invalidate { id } => {
            let inv = ledger.invalidate_investment(&id).await?;
            println!("{} reopened", inv.external_id);
        }
        LedgerCommand::CreditTerms { id, monthly, rate } => {
            let credit = ledger.set_credit_terms(&id, monthly, rate).await?;
            println!(
                "{}: monthly {}, rate {}",
                credit.external_id,
                credit.monthly_payment.map(|m| money(m, currency)).unwrap_or_else(|| "-".to_string()),
                credit.interest_rate.map(|r| format_percent(r, 2)).unwrap_or_else(|| "-".to_string())
            );
        }
        LedgerCommand::NetWorth { date } => {
            dirty = false;
            let date = date_arg("--date", date.as_deref())?.unwrap_or_else(today_end);
            let value = ledger.net_worth_breakdown(date);
            println!("Net worth on {}: {}", format_serial(Some(date), date_format), money(value.total, currency));
            println!("  income              {}", money(value.income, currency));
            println!("  expenses            {}", money(value.expenses, currency));
            println!("  investment profit   {}", money(value.investment_profit, currency));
            for group in &value.excluded_groups {
                println!("  not counted (open at a loss): {}", group.as_deref().unwrap_or("<untagged>"));
            }
        }
        LedgerCommand::History { months } => {
            dirty = false;
            let report = ledger.net_worth_report();
            let skip = months.map_or(0, |n| report.points.len().saturating_sub(n));
            for point in report.points.iter().skip(skip) {
                println!(
                    "{:<10}  {:>16}",
                    format_serial(Some(point.date), date_format),
                    money(point.net_worth, currency)
                );
            }
            println!(
                "change {} ({})",
                money(report.change, currency),
                format_percent(report.change_percentage, 2)
            );
        }
        LedgerCommand::Summary => {
            dirty = false;
            let summary = ledger.summary();
            println!("transactions   {}", summary.total_transactions);
            println!(
                "investments    {} ({} open)",
                summary.total_investments, summary.open_investments
            );
            println!("credits        {}", summary.total_credits);
            println!("balance        {}", money(summary.current_balance, currency));
            println!(
                "period         {} to {}",
                format_serial(summary.period_start, date_format),
                format_serial(summary.period_end, date_format)
            );
        }
        LedgerCommand::Wipe { yes } => {
            if !yes {
                bail!("Refusing to wipe without --yes");
            }
            ledger.wipe().await;
            println!("Ledger wiped");
        }
    }

    if dirty {
        ledger.save(&snapshot).context("Failed to save ledger snapshot")?;
        log::info!("Snapshot saved to {}", snapshot.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_init_config_is_not_a_ledger_command() {
        let args = Args::try_parse_from(["fintrack", "init-config", "--force"]).unwrap();
        assert!(matches!(args.command, Command::InitConfig { force: true }));

        let args = Args::try_parse_from(["fintrack", "net-worth", "--date", "2024-01-31"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Ledger(LedgerCommand::NetWorth { date: Some(_) })
        ));
    }

    #[test]
    fn test_init_config_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        init_config(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), Config::generate_default());

        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();
        assert!(init_config(&path, false).is_err());
        init_config(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), Config::generate_default());
    }
}
