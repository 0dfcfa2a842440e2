use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use product_grouping::{
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{self, EventSender},
    handlers::AppServices,
    repositories::{
        GroupRecord, InMemoryAllocationStore, ProductBatchRepository, ProductGroupRepository,
    },
    services::{
        group_queries::{BatchView, GroupItemView, GroupSummary},
        grouping::{GroupingService, RunSummary},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::Import(args) => handle_import(&context, args, cli.json).await?,
        Commands::Run(args) => handle_run(&context, args, cli.json).await?,
        Commands::Batches => handle_batches(&context, cli.json).await?,
        Commands::Groups(args) => handle_groups(&context, args, cli.json).await?,
        Commands::Group(args) => handle_group(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "grouping",
    about = "Operator CLI for product batch import and grouping",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Import a price list (.xlsx workbook or delimited text)
    Import(ImportArgs),
    /// Run grouping once
    Run(RunArgs),
    /// List every batch with its stock
    Batches,
    /// List groups, newest first
    Groups(GroupsArgs),
    /// Show the items of one group
    Group(GroupArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Path to the tab, semicolon or comma separated sheet
    path: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    /// Show the groups a run would create without writing anything
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

#[derive(Args)]
struct GroupsArgs {
    #[arg(long)]
    skip: Option<u64>,
    #[arg(long)]
    take: Option<u64>,
}

#[derive(Args)]
struct GroupArgs {
    id: Uuid,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_sender, mut event_rx) = events::channel(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "grouping_cli", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db,
            event_sender,
        })
    }

    fn services(&self) -> AppServices {
        AppServices::new(self.db.clone(), Some(self.event_sender.clone()))
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations_with_retry(&context.db, context.config.migration_retry_attempts)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

#[derive(Serialize)]
struct ImportOutput {
    imported_count: usize,
}

async fn handle_import(context: &CliContext, args: ImportArgs, json: bool) -> Result<()> {
    let input = fs::read(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let imported_count = context
        .services()
        .import
        .import(&input)
        .await
        .with_context(|| format!("failed to import {}", args.path.display()))?;

    if json {
        print_json(&ImportOutput { imported_count })?;
    } else {
        println!("Imported {} batches from {}", imported_count, args.path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct DryRunOutput {
    summary: RunSummary,
    groups: Vec<DryRunGroup>,
}

#[derive(Serialize)]
struct DryRunGroup {
    name: String,
    total_price: rust_decimal::Decimal,
    items: Vec<DryRunItem>,
}

#[derive(Serialize)]
struct DryRunItem {
    batch_id: Uuid,
    quantity: i32,
    line_total: rust_decimal::Decimal,
}

impl From<GroupRecord> for DryRunGroup {
    fn from(record: GroupRecord) -> Self {
        Self {
            name: record.group.name,
            total_price: record.group.total_price,
            items: record
                .items
                .into_iter()
                .map(|item| DryRunItem {
                    batch_id: item.batch_id,
                    quantity: item.quantity,
                    line_total: item.line_total,
                })
                .collect(),
        }
    }
}

async fn handle_run(context: &CliContext, args: RunArgs, json: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    if !args.dry_run {
        let summary = context
            .services()
            .grouping
            .run_allocation(&cancel)
            .await
            .context("grouping run failed")?;
        if json {
            print_json(&summary)?;
        } else {
            render_summary(&summary);
        }
        return Ok(());
    }

    let batches = ProductBatchRepository::new(context.db.clone())
        .find_available_for_grouping()
        .await
        .context("failed to load batches")?;
    let next_sequence = ProductGroupRepository::new(context.db.clone())
        .max_sequence()
        .await
        .context("failed to read group sequence")?
        .unwrap_or(0)
        + 1;

    let store = Arc::new(InMemoryAllocationStore::with_next_sequence(batches, next_sequence));
    let summary = GroupingService::new(store.clone())
        .run_allocation(&cancel)
        .await
        .context("dry run failed")?;
    let groups: Vec<DryRunGroup> = store.groups().into_iter().map(DryRunGroup::from).collect();

    if json {
        print_json(&DryRunOutput { summary, groups })?;
    } else {
        println!("Dry run, nothing was written");
        for group in &groups {
            println!(
                "- {} • total {} • {} items",
                group.name,
                group.total_price,
                group.items.len()
            );
            for item in &group.items {
                println!(
                    "    batch {} × {} = {}",
                    item.batch_id, item.quantity, item.line_total
                );
            }
        }
        render_summary(&summary);
    }
    Ok(())
}

async fn handle_batches(context: &CliContext, json: bool) -> Result<()> {
    let batches = context.services().queries.list_batches().await?;
    if json {
        print_json(&batches)?;
    } else if batches.is_empty() {
        println!("No batches");
    } else {
        batches.iter().for_each(render_batch);
    }
    Ok(())
}

async fn handle_groups(context: &CliContext, args: GroupsArgs, json: bool) -> Result<()> {
    let groups = context
        .services()
        .queries
        .list_groups(args.skip, args.take)
        .await?;
    if json {
        print_json(&groups)?;
    } else if groups.is_empty() {
        println!("No groups");
    } else {
        groups.iter().for_each(render_group);
    }
    Ok(())
}

async fn handle_group(context: &CliContext, args: GroupArgs, json: bool) -> Result<()> {
    let items = context
        .services()
        .queries
        .group_items(args.id)
        .await
        .map_err(|e| anyhow!("failed to load group {}: {}", args.id, e))?;
    if json {
        print_json(&items)?;
    } else {
        items.iter().for_each(render_item);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_summary(summary: &RunSummary) {
    println!(
        "Groups created: {} • batches exhausted: {} • unallocatable: {}{}",
        summary.groups_created,
        summary.batches_exhausted,
        summary.unallocatable_batches,
        if summary.cancelled { " • cancelled" } else { "" }
    );
}

fn render_batch(batch: &BatchView) {
    println!(
        "- {} • {} • {} per {} • {}/{} left • {}",
        batch.id,
        batch.name,
        batch.unit_price,
        batch.unit,
        batch.remaining_quantity,
        batch.initial_quantity,
        batch.status
    );
}

fn render_group(group: &GroupSummary) {
    println!(
        "- {} • {} • total {} • {}",
        group.id,
        group.name,
        group.total_price,
        group.created_at.to_rfc3339()
    );
}

fn render_item(item: &GroupItemView) {
    println!(
        "- {} • {} × {} {} @ {} = {}",
        item.batch_id, item.name, item.quantity, item.unit, item.unit_price, item.line_total
    );
}
