//! promo-alloc - Campaign allocation planner
//!
//! Loads candidates and vendor caps from a record-store snapshot, ranks the
//! pool against the campaign's genres, allocates the goal, applies any manual
//! overrides and prints the projection with every validation error.
//!
//! **Usage:**
//! ```bash
//! promo-alloc plan --snapshot pool.json --goal 50000 --days 30 --genre pop \
//!     [--budget 900 --cpm 2.5] [--override pl-1=12000] [--save campaigns.jsonl] [--json]
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use promo_alloc::{CampaignPlan, CampaignRequest, Planner};
use promo_common::config::{resolve_config_path, LoggingConfig, TomlConfig};
use promo_common::store::{CandidateFilter, JsonSnapshotStore, RecordStore};
use promo_common::{CandidateId, ZeroCapPolicy};
use tracing::{info, warn};

/// Command-line arguments for promo-alloc
#[derive(Parser, Debug)]
#[command(name = "promo-alloc")]
#[command(about = "Plan stream/view allocations for a promotion campaign")]
#[command(version)]
struct Args {
    /// Config file (overrides PROMO_CONFIG and the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank, allocate and validate a campaign
    Plan(PlanArgs),
}

#[derive(clap::Args, Debug)]
struct PlanArgs {
    /// Record-store snapshot (JSON with `candidates` and `vendors`)
    #[arg(long, value_name = "FILE")]
    snapshot: PathBuf,

    /// Total streams/views to deliver
    #[arg(long)]
    goal: i64,

    /// Campaign duration in days
    #[arg(long)]
    days: u32,

    /// Target genre (repeatable)
    #[arg(long = "genre", value_name = "GENRE")]
    genres: Vec<String>,

    /// Campaign name
    #[arg(long, default_value = "Untitled campaign")]
    name: String,

    /// Campaign budget
    #[arg(long, default_value = "0")]
    budget: f64,

    /// Cost per 1000 streams/views; enables the budget check
    #[arg(long)]
    cpm: Option<f64>,

    /// Include inactive candidates
    #[arg(long)]
    include_inactive: bool,

    /// Override zero-cap policy from config ("unlimited" or "blocked")
    #[arg(long, value_name = "POLICY")]
    zero_cap_policy: Option<String>,

    /// Manual amount for one candidate, `ID=AMOUNT` (repeatable, 0 removes)
    #[arg(long = "override", value_name = "ID=AMOUNT")]
    overrides: Vec<String>,

    /// Append the campaign to this JSON-lines file when the plan is valid
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Print the full plan as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // No subscriber exists until the config is loaded; report its source after
    let config_path = resolve_config_path(args.config.as_deref());
    let config = match &config_path {
        Some(path) => TomlConfig::load(path),
        None => Ok(TomlConfig::default()),
    }
    .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;
    report_config_source(config_path.as_deref());

    info!(
        "Starting promo-alloc v{} (min_daily_allocation={}, zero_cap_policy={:?})",
        env!("CARGO_PKG_VERSION"),
        config.allocation.min_daily_allocation,
        config.allocation.zero_cap_policy
    );

    match args.command {
        Command::Plan(plan_args) => run_plan(plan_args, config.allocation),
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn report_config_source(path: Option<&Path>) {
    match path {
        Some(path) if path.exists() => info!("Loaded configuration from {}", path.display()),
        Some(path) => warn!("Config file {} not found, using built-in defaults", path.display()),
        None => info!("No config file found, using built-in defaults"),
    }
}

fn run_plan(args: PlanArgs, mut params: promo_common::config::AllocationParams) -> Result<()> {
    if let Some(raw) = &args.zero_cap_policy {
        params.zero_cap_policy = ZeroCapPolicy::parse(raw)
            .with_context(|| format!("Unknown zero-cap policy '{}'", raw))?;
    }
    if args.genres.is_empty() {
        warn!("No target genres given; every candidate scores 0 and ranks by yield");
    }

    let mut store = JsonSnapshotStore::open(&args.snapshot, args.save.clone())
        .with_context(|| format!("Failed to open snapshot {}", args.snapshot.display()))?;

    let filter = CandidateFilter {
        active_only: !args.include_inactive,
    };
    let candidates = store.fetch_candidates(filter)?;
    let vendor_caps = store.fetch_vendor_caps()?;

    let request = CampaignRequest {
        name: args.name.clone(),
        goal: args.goal,
        budget: args.budget,
        duration_days: args.days,
        target_genres: args.genres.clone(),
        cost_per_thousand: args.cpm,
    };

    let planner = Planner::new(params);
    let mut plan = planner.plan(&request, &candidates, &vendor_caps);

    for raw in &args.overrides {
        let (id, amount) = parse_override(raw)?;
        plan = planner
            .apply_override(plan, &id, amount, &candidates, &vendor_caps)
            .with_context(|| format!("Failed to apply override '{}'", raw))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    if !plan.is_valid() {
        bail!(
            "Plan has {} validation error(s); campaign not saved",
            plan.validation.errors.len()
        );
    }

    if args.save.is_some() {
        let campaign = plan.into_campaign()?;
        let id = store.persist_campaign(&campaign)?;
        info!("✓ Campaign saved: {}", id);
    }

    Ok(())
}

fn parse_override(raw: &str) -> Result<(CandidateId, i64)> {
    let Some((id, amount)) = raw.split_once('=') else {
        bail!("Override '{}' must look like ID=AMOUNT", raw);
    };
    let id = id.trim();
    if id.is_empty() {
        bail!("Override '{}' has an empty candidate id", raw);
    }
    let amount: i64 = amount
        .trim()
        .parse()
        .with_context(|| format!("Override '{}' has a non-integer amount", raw))?;
    Ok((CandidateId::from(id), amount))
}

fn print_plan(plan: &CampaignPlan) {
    let relevance = |id: &CandidateId| {
        plan.ranked
            .iter()
            .find(|m| &m.candidate.id == id)
            .map(|m| m.relevance)
    };

    let unit = plan
        .ranked
        .first()
        .map(|m| m.candidate.platform.yield_unit())
        .unwrap_or("streams");

    println!("Campaign: {}", plan.request.name);
    println!(
        "Goal: {} {} over {} days",
        plan.request.goal, unit, plan.request.duration_days
    );
    println!();
    println!("{:<24} {:<20} {:>10} {:>12}", "CANDIDATE", "VENDOR", "RELEVANCE", "AMOUNT");
    for allocation in &plan.allocations {
        let score = relevance(&allocation.candidate_id)
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<20} {:>10} {:>12}",
            allocation.candidate_id, allocation.vendor_id, score, allocation.amount
        );
    }
    println!();
    println!(
        "Projected total: {} ({:.1}% of goal)",
        plan.projection.total_amount,
        plan.projection.coverage_percent()
    );
    for (vendor, total) in &plan.projection.per_vendor {
        println!("  {:<20} {:>12}", vendor, total);
    }
    if let Some(cost) = plan.projected_cost() {
        println!("Projected cost: {:.2} (budget {:.2})", cost, plan.request.budget);
    }

    if plan.validation.is_valid {
        println!("Validation: OK");
    } else {
        println!("Validation: {} error(s)", plan.validation.errors.len());
        for error in &plan.validation.errors {
            println!("  - {}", error);
        }
    }
}
