use clap::{Parser, Subcommand};
use cuotas::application::engine::InstallmentEngine;
use cuotas::config::Config;
use cuotas::domain::event::EventId;
use cuotas::domain::ports::{EventCatalogBox, LedgerStoreBox, NotifierRef};
use cuotas::domain::registration::RegistrationId;
use cuotas::infrastructure::in_memory::{InMemoryEventCatalog, InMemoryLedgerStore};
use cuotas::infrastructure::notifier::LogNotifier;
use cuotas::interfaces::csv::journal_reader::JournalReader;
use cuotas::interfaces::csv::report_writer::ReportWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file with the event catalog
    #[arg(long, default_value = "cuotas.toml")]
    config: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the configured events
    Events,
    /// Apply a CSV journal of ledger operations and print the income report
    Apply {
        /// Journal CSV file
        input: PathBuf,
    },
    /// Print the installment schedule of a registration
    Installments { registration: RegistrationId },
    /// Print the income report
    Report {
        #[arg(long)]
        event_id: Option<EventId>,
        /// Emit JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Send payment reminders to registrations with unpaid installments
    Remind {
        #[arg(long)]
        event_id: Option<EventId>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cuotas=info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = cuotas::infrastructure::rocksdb::RocksDBStore::open(path)?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            help = "rebuild with `--features storage-rocksdb`",
            "--db-path requires RocksDB support"
        )),
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let catalog: EventCatalogBox = Box::new(InMemoryEventCatalog::new(config.event_definitions()?));
    let store = open_store(cli.db_path)?;
    let notifier: NotifierRef = Arc::new(LogNotifier::new());

    let engine =
        InstallmentEngine::new(catalog, store, notifier).with_reminder_config(config.reminders);
    let mut writer = ReportWriter::new(io::stdout());

    match cli.command {
        Command::Events => {
            for event in engine.events().await? {
                println!(
                    "{}\t{}\t{} installments\t{}\t{}",
                    event.id,
                    event.title,
                    event.installment_count(),
                    event.fee_amount(),
                    if event.active { "active" } else { "inactive" }
                );
            }
        }
        Command::Apply { input } => {
            let file = File::open(input).into_diagnostic()?;
            for (line, entry) in JournalReader::new(file).entries().enumerate() {
                // Header is line 1.
                let line = line + 2;
                match entry {
                    Ok(entry) => {
                        if let Err(e) = entry.apply(&engine).await {
                            eprintln!("Error applying journal line {line}: {e}");
                        }
                    }
                    Err(e) => {
                        eprintln!("Error reading journal line {line}: {e}");
                    }
                }
            }
            let report = engine.income_report(None).await?;
            writer.write_income_report(&report)?;
        }
        Command::Installments { registration } => {
            let schedule = engine.installments(registration).await?;
            writer.write_schedule(&schedule)?;
        }
        Command::Report { event_id, json } => {
            let report = engine.income_report(event_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                writer.write_income_report(&report)?;
            }
        }
        Command::Remind { event_id } => {
            let report = engine.send_reminders(event_id).await?;
            writer.write_reminders(&report)?;
            eprintln!("sent: {}, failed: {}", report.sent, report.failed);
        }
    }

    Ok(())
}
