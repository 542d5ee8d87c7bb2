use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use stockbook_config::{load_config, StockbookConfig};
use stockbook_core::{
    CommodityId, CounterpartyId, CounterpartyKind, CounterpartyPatch, NewCounterparty, OwnerId,
    PriceSide, TransactionKind,
};
use stockbook_events::EventBus;
use stockbook_ledger::{default_commodities, SqliteStore, TransactionQuery};
use stockbook_posting::{
    patch_counterparty, register_counterparty, PostingError, PostingRequest, PostingService,
    TransactionPoster,
};
use tracing::{debug, info};

use crate::telemetry::init_tracing;

/// Exit status for requests the core rejected.
pub const EXIT_REJECTED: u8 = 2;
/// Exit status for storage and other server-side failures.
pub const EXIT_FAILED: u8 = 1;

#[derive(Parser)]
#[command(name = "stockbook")]
#[command(version, about = "Commodity purchase, sale and stock ledger", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, default_value = "stockbook.toml")]
    config: PathBuf,

    /// Caller the command acts for
    #[arg(long, global = true, env = "STOCKBOOK_OWNER")]
    owner: Option<String>,

    /// Override the database path from configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed the default commodity catalog
    Init,
    /// List the commodity catalog
    Commodities,
    /// Manage suppliers
    Supplier {
        #[command(subcommand)]
        action: CounterpartyAction,
    },
    /// Manage customers
    Customer {
        #[command(subcommand)]
        action: CounterpartyAction,
    },
    /// Record a purchase from a supplier
    Purchase(PostingArgs),
    /// Record a sale to a customer
    Sale(PostingArgs),
    /// Show stock balances
    Inventory,
    /// Show latest prices per commodity
    Rates {
        #[arg(value_enum)]
        side: SideArg,
    },
    /// List transactions, newest first
    Transactions(TransactionArgs),
}

#[derive(Subcommand)]
enum CounterpartyAction {
    /// Register a new entry
    Add(ContactArgs),
    /// Change fields of an existing entry
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: PatchArgs,
    },
    /// List entries
    List,
}

#[derive(Args)]
struct ContactArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Mobile number, 03XX-XXXXXXX
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

#[derive(Args)]
struct PatchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

#[derive(Args)]
struct PostingArgs {
    #[arg(long)]
    commodity: Option<String>,
    /// Supplier id for purchases, customer id for sales
    #[arg(long, visible_aliases = ["supplier", "customer"])]
    counterparty: Option<String>,
    #[arg(long)]
    quantity: Option<Decimal>,
    /// Price per unit
    #[arg(long)]
    rate: Option<Decimal>,
    /// Total amount
    #[arg(long)]
    total: Option<Decimal>,
    #[arg(long)]
    note: Option<String>,
    /// When the trade happened (RFC 3339); defaults to now
    #[arg(long)]
    event_time: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct TransactionArgs {
    #[arg(long, value_enum)]
    kind: Option<SideArg>,
    #[arg(long)]
    commodity: Option<String>,
    /// Start of the event-time range; ignored unless --to is also given
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// End of the event-time range; ignored unless --from is also given
    #[arg(long)]
    to: Option<DateTime<Utc>>,
    /// Match commodity name, counterparty name or YYYY-MM-DD date
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Purchase,
    Sale,
}

impl From<SideArg> for TransactionKind {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Purchase => TransactionKind::Purchase,
            SideArg::Sale => TransactionKind::Sale,
        }
    }
}

impl From<SideArg> for PriceSide {
    fn from(value: SideArg) -> Self {
        TransactionKind::from(value).price_side()
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(Some(&cli.config))?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    init_tracing(&config.telemetry);
    debug!(
        config = %cli.config.display(),
        database = %config.database.path.display(),
        "loaded configuration"
    );

    let store = open_store(&config)?;
    let inserted = store
        .bootstrap(&default_commodities())
        .context("failed to bootstrap store")?;
    let owner = cli
        .owner
        .as_deref()
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
        .map(OwnerId::from);

    match cli.command {
        Commands::Init => print_json(&serde_json::json!({
            "database": config.database.path,
            "seeded": inserted,
        })),
        Commands::Commodities => print_json(&store.list_commodities()?),
        Commands::Supplier { action } => {
            counterparty(&store, owner.as_ref(), CounterpartyKind::Supplier, action)
        }
        Commands::Customer { action } => {
            counterparty(&store, owner.as_ref(), CounterpartyKind::Customer, action)
        }
        Commands::Purchase(args) => {
            post(&config, store, owner, TransactionKind::Purchase, args).await
        }
        Commands::Sale(args) => post(&config, store, owner, TransactionKind::Sale, args).await,
        Commands::Inventory => {
            let owner = require_owner(owner.as_ref())?;
            print_json(&store.inventory(owner)?)
        }
        Commands::Rates { side } => {
            let owner = require_owner(owner.as_ref())?;
            print_json(&store.rate_quotes(owner, side.into())?)
        }
        Commands::Transactions(args) => {
            let owner = require_owner(owner.as_ref())?;
            let mut query = TransactionQuery::default().with_time_range(args.from, args.to);
            query.kind = args.kind.map(TransactionKind::from);
            query.commodity = args.commodity.map(CommodityId::from);
            query.search = args.search;
            query.page = args.page;
            query.limit = args.limit;
            print_json(&store.list_transactions(owner, &query)?)
        }
    }
}

/// [`EXIT_REJECTED`] for requests the core refused, [`EXIT_FAILED`] otherwise.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PostingError>() {
        Some(posting) if !posting.is_server() => EXIT_REJECTED,
        _ => EXIT_FAILED,
    }
}

fn open_store(config: &StockbookConfig) -> Result<SqliteStore> {
    SqliteStore::with_busy_timeout(&config.database.path, config.database.busy_timeout())
        .with_context(|| format!("failed to open {}", config.database.path.display()))
}

fn require_owner(owner: Option<&OwnerId>) -> Result<&OwnerId> {
    owner.ok_or_else(|| PostingError::Unauthorized.into())
}

async fn post(
    config: &StockbookConfig,
    store: SqliteStore,
    owner: Option<OwnerId>,
    kind: TransactionKind,
    args: PostingArgs,
) -> Result<()> {
    let poster =
        TransactionPoster::new(store).with_consistency(config.posting.consistency_mode());
    let service = PostingService::new(poster, Arc::new(EventBus::default()));
    let request = PostingRequest {
        commodity_id: args.commodity.map(CommodityId::from),
        counterparty_id: args.counterparty.map(CounterpartyId::from),
        quantity: args.quantity,
        rate: args.rate,
        total: args.total,
        note: args.note,
        event_time: args.event_time,
    };
    let receipt = match kind {
        TransactionKind::Purchase => service.purchase(owner, request).await?,
        TransactionKind::Sale => service.sale(owner, request).await?,
    };
    info!(transaction = %receipt.transaction_id, kind = %kind, "recorded");
    print_json(&receipt)
}

fn counterparty(
    store: &SqliteStore,
    owner: Option<&OwnerId>,
    kind: CounterpartyKind,
    action: CounterpartyAction,
) -> Result<()> {
    match action {
        CounterpartyAction::Add(args) => {
            let created = register_counterparty(
                store,
                owner,
                kind,
                NewCounterparty {
                    name: args.name,
                    company: args.company,
                    email: args.email,
                    phone: args.phone,
                    address: args.address,
                },
            )?;
            print_json(&created)
        }
        CounterpartyAction::Update { id, fields } => {
            let updated = patch_counterparty(
                store,
                owner,
                kind,
                &CounterpartyId::from(id),
                CounterpartyPatch {
                    name: fields.name,
                    company: fields.company,
                    email: fields.email,
                    phone: fields.phone,
                    address: fields.address,
                },
            )?;
            print_json(&updated)
        }
        CounterpartyAction::List => {
            let owner = require_owner(owner)?;
            print_json(&store.list_counterparties(owner, kind)?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rejected_postings_exit_with_two() {
        let rejected = anyhow::Error::from(PostingError::Validation("bad".into()));
        assert_eq!(exit_status(&rejected), EXIT_REJECTED);
        let server = anyhow::Error::from(PostingError::Server(
            stockbook_ledger::LedgerError::Storage("disk".into()),
        ));
        assert_eq!(exit_status(&server), EXIT_FAILED);
        let wrapped = anyhow::Error::from(PostingError::Unauthorized).context("posting");
        assert_eq!(exit_status(&wrapped), EXIT_REJECTED);
        assert_eq!(exit_status(&anyhow::anyhow!("config")), EXIT_FAILED);
    }
}
