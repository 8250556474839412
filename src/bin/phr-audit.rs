//! phr-audit - search and summarise a local audit store
//!
//! Reads the JSON file written by a local-store destination.

use clap::{Args, Parser, Subcommand};
use phr_audit::audit::destinations::local_store;
use phr_audit::audit::filter::parse_date_bound;
use phr_audit::audit::{AuditEntry, AuditFilter, AuditSummary, EventType, HipaaCategory};
use phr_audit::core::now;
use phr_audit::{logging, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// Search and summarise HIPAA audit logs
#[derive(Parser)]
#[command(name = "phr-audit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Local audit store (JSON array of entries)
    #[arg(short, long, env = "PHR_AUDIT_STORE", default_value = "audit-store.json", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List matching entries, newest first
    Search(SearchArgs),
    /// Print activity counts as JSON
    Summary,
}

#[derive(Args)]
struct SearchArgs {
    /// User id (substring match)
    #[arg(long)]
    user: Option<String>,

    /// Event type, e.g. read, access_denied
    #[arg(long)]
    event: Option<String>,

    /// Resource type, e.g. Patient
    #[arg(long)]
    resource: Option<String>,

    /// Earliest timestamp (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Latest timestamp (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<String>,

    /// Only entries that do (true) or do not (false) involve PHI
    #[arg(long)]
    phi: Option<bool>,

    /// HIPAA category
    #[arg(long)]
    category: Option<HipaaCategory>,

    /// Only access_denied and breach_attempt events
    #[arg(long)]
    security: bool,

    /// Maximum number of entries to print
    #[arg(long)]
    limit: Option<usize>,

    /// Print entries as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn to_filter(&self) -> Result<AuditFilter> {
        let mut filter = if self.security {
            AuditFilter::security_events()
        } else {
            AuditFilter::new()
        };
        if let Some(user) = &self.user {
            filter = filter.by_user(user);
        }
        if let Some(event) = &self.event {
            filter = filter.by_event_type(EventType::from(event.as_str()));
        }
        if let Some(resource) = &self.resource {
            filter = filter.by_resource_type(resource);
        }
        if let Some(from) = &self.from {
            filter = filter.since(parse_date_bound(from, false)?);
        }
        if let Some(to) = &self.to {
            filter = filter.until(parse_date_bound(to, true)?);
        }
        if let Some(phi) = self.phi {
            filter = filter.by_phi(phi);
        }
        if let Some(category) = self.category {
            filter = filter.by_category(category);
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        Ok(filter)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing("warn");
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut entries = local_store::load(&cli.store).await?;
    entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

    match cli.command {
        Commands::Search(args) => {
            let filter = args.to_filter()?;
            let matched: Vec<AuditEntry> = entries.into_iter().filter(|e| filter.matches(e)).collect();
            let page = filter.paginate(matched);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_table(&page);
            }
        }
        Commands::Summary => {
            let summary = AuditSummary::from_entries(&entries, now());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn print_table(entries: &[AuditEntry]) {
    println!(
        "{:<25} {:<15} {:<20} {:<20} {:<20} {:<15} {:<4}",
        "TIMESTAMP", "EVENT", "USER", "RESOURCE", "RESOURCE ID", "CATEGORY", "PHI"
    );
    for entry in entries {
        println!(
            "{:<25} {:<15} {:<20} {:<20} {:<20} {:<15} {:<4}",
            entry.timestamp().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            entry.event_type().as_str(),
            entry.user_id(),
            entry.resource_type(),
            entry.resource_id().unwrap_or("-"),
            entry.hipaa_category().as_str(),
            if entry.phi_involved() { "yes" } else { "no" },
        );
    }
    println!("{} entries", entries.len());
}
