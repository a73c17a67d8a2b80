use std::io::{self, BufRead, Write};
use std::sync::Arc;

use applicant_sync::completion::OpenAiClient;
use applicant_sync::config::AppConfig;
use applicant_sync::error::AppError;
use applicant_sync::store::{AirtableStore, RecordId};
use applicant_sync::telemetry;
use applicant_sync::workflows::compress::{CompressError, SnapshotCompressor};
use applicant_sync::workflows::enrichment::{Enrichment, EnrichmentEngine, EnrichmentOutcome};
use applicant_sync::workflows::reconcile::{ReconcileStats, SnapshotReconciler};
use applicant_sync::workflows::shortlist::{ShortlistEvaluator, ShortlistResult, ShortlistRules};
use applicant_sync::workflows::{BatchOutcome, BatchReport};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "applicant-sync",
    about = "Keep applicant snapshots, Airtable child tables, LLM notes and the shortlist in step",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an applicant's Compressed JSON from its child rows, then enrich it
    Compress {
        /// External applicant identifier (prompted for when omitted)
        applicant_id: Option<String>,
    },
    /// Push every applicant's Compressed JSON back into the child tables
    Reconcile(BatchArgs),
    /// Run LLM enrichment for one applicant record
    Enrich {
        /// Airtable record id of the applicant (prompted for when omitted)
        record_id: Option<String>,
    },
    /// Evaluate every applicant against the shortlist rules
    Shortlist(BatchArgs),
    /// Print the tables, fields and views of the configured base
    Schema,
}

#[derive(Args, Debug, Default)]
struct BatchArgs {
    /// Print the batch report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(AirtableStore::new(&config.airtable)?);

    match cli.command {
        Command::Compress { applicant_id } => {
            let applicant_id = match applicant_id {
                Some(id) => id,
                None => prompt("Enter Applicant ID: ")?,
            };
            let completion = Arc::new(OpenAiClient::new(&config.completion)?);
            let enricher = Arc::new(EnrichmentEngine::new(
                store.clone(),
                completion,
                config.retry.clone(),
            ));
            run_compress(SnapshotCompressor::new(store, enricher), &applicant_id)
        }
        Command::Reconcile(args) => {
            let report = SnapshotReconciler::new(store).reconcile_all()?;
            print_batch(&report, args.json, render_reconcile)
        }
        Command::Enrich { record_id } => {
            let record_id = match record_id {
                Some(id) => id,
                None => prompt("Enter Applicant Record ID to enrich: ")?,
            };
            let completion = Arc::new(OpenAiClient::new(&config.completion)?);
            info!(model = completion.model_name(), "enrichment client ready");
            let engine = EnrichmentEngine::new(store, completion, config.retry.clone());
            let record_id = RecordId(record_id);
            match engine.enrich(&record_id)? {
                EnrichmentOutcome::Enriched(enrichment) => render_enrichment(&enrichment),
                EnrichmentOutcome::Unchanged => println!(
                    "Compressed JSON for {record_id} has not changed. Skipping LLM enrichment."
                ),
            }
            Ok(())
        }
        Command::Shortlist(args) => {
            let report =
                ShortlistEvaluator::new(store, ShortlistRules::default()).evaluate_all()?;
            print_batch(&report, args.json, render_shortlist)
        }
        Command::Schema => {
            let schema = store.schema()?;
            for table in &schema.tables {
                println!("\nTable: {} (ID: {})", table.name, table.id);
                println!("Primary Field ID: {}", table.primary_field_id);
                println!("Fields:");
                for field in &table.fields {
                    println!("  - {} (ID: {}), Type: {}", field.name, field.id, field.kind);
                }
                println!("Views:");
                for view in &table.views {
                    println!("  - {} (ID: {}), Type: {}", view.name, view.id, view.kind);
                }
            }
            Ok(())
        }
    }
}

fn run_compress(
    compressor: SnapshotCompressor<AirtableStore, OpenAiClient>,
    applicant_id: &str,
) -> Result<(), AppError> {
    let report = compressor.compress(applicant_id)?;
    let pretty = report
        .snapshot
        .to_pretty_json()
        .map_err(CompressError::from)?;
    println!("{pretty}");
    println!("Compressed JSON written to applicant record {}", report.record_id);

    match report.enrichment {
        Ok(EnrichmentOutcome::Enriched(enrichment)) => render_enrichment(&enrichment),
        Ok(EnrichmentOutcome::Unchanged) => {
            println!("Snapshot unchanged since last enrichment; LLM step skipped.")
        }
        Err(err) => eprintln!("Enrichment failed: {err}"),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String, AppError> {
    let mut stdout = io::stdout();
    stdout.write_all(label.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no identifier entered",
        )));
    }
    Ok(value)
}

fn print_batch<T: Serialize>(
    report: &BatchReport<T>,
    as_json: bool,
    render: fn(&T) -> String,
) -> Result<(), AppError> {
    if as_json {
        let body = serde_json::to_string_pretty(report).map_err(io::Error::from)?;
        println!("{body}");
        return Ok(());
    }

    for entry in &report.entries {
        match &entry.outcome {
            BatchOutcome::Completed(result) => {
                println!("- {}: {}", entry.applicant, render(result))
            }
            BatchOutcome::Skipped(reason) => println!("- {}: skipped, {}", entry.applicant, reason),
            BatchOutcome::Failed(error) => println!("- {}: failed, {}", entry.applicant, error),
        }
    }
    println!(
        "\n{} applicants, {} skipped, {} failed",
        report.entries.len(),
        report.skipped(),
        report.failed()
    );
    Ok(())
}

fn render_reconcile(stats: &ReconcileStats) -> String {
    format!(
        "experience +{} ~{} ={} -{}, personal {:?}, salary {:?}",
        stats.experience.created,
        stats.experience.updated,
        stats.experience.unchanged,
        stats.experience.deleted,
        stats.personal,
        stats.salary
    )
}

fn render_shortlist(result: &ShortlistResult) -> String {
    format!("{} ({})", result.status.label(), result.reason)
}

fn render_enrichment(enrichment: &Enrichment) {
    println!("LLM Summary: {}", enrichment.summary);
    match enrichment.score {
        Some(score) => println!("LLM Score: {score}"),
        None => println!("LLM Score: (not provided)"),
    }
    println!("LLM Issues: {}", enrichment.issues);
    println!("LLM Follow-Ups: {}", enrichment.follow_ups);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_accepts_optional_applicant_id() {
        let cli = Cli::try_parse_from(["applicant-sync", "compress", "A-17"]).expect("parses");
        assert!(matches!(
            cli.command,
            Command::Compress { applicant_id: Some(ref id) } if id == "A-17"
        ));

        let cli = Cli::try_parse_from(["applicant-sync", "compress"]).expect("parses");
        assert!(matches!(cli.command, Command::Compress { applicant_id: None }));
    }

    #[test]
    fn batch_commands_take_json_flag() {
        let cli =
            Cli::try_parse_from(["applicant-sync", "shortlist", "--json"]).expect("parses");
        assert!(matches!(cli.command, Command::Shortlist(BatchArgs { json: true })));

        let cli = Cli::try_parse_from(["applicant-sync", "reconcile"]).expect("parses");
        assert!(matches!(cli.command, Command::Reconcile(BatchArgs { json: false })));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["applicant-sync"]).is_err());
    }

    #[test]
    fn shortlist_summary_uses_status_label() {
        let result = ShortlistResult {
            status: applicant_sync::workflows::shortlist::ShortlistStatus::NotShortlisted,
            reason: "Location criteria not met.".to_string(),
            lead: None,
        };
        assert_eq!(
            render_shortlist(&result),
            "Not Shortlisted (Location criteria not met.)"
        );
    }
}
