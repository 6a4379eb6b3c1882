#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line vehicle roadworthiness inspection.
//!
//! ```text
//! roadworthy checklist
//! roadworthy inspect <file.toml> [--json]
//! roadworthy [--checklist <path>]
//! ```
//!
//! Running `roadworthy` with no subcommand enters the interactive form.
//! The safety analysis provider is chosen from the environment (see
//! [`roadworthy_ai::providers::create_provider_from_env`]); without one,
//! every submission reports the fallback analysis.
//!
//! Uses `indicatif-log-bridge` (via [`roadworthy_cli_utils::init_logger`])
//! so log lines and the submission spinner never fight for the terminal.

mod evidence;
mod inspection_file;
mod interactive;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use roadworthy_ai::providers::{LlmProvider, UnconfiguredProvider, create_provider_from_env};
use roadworthy_cli_utils::{MultiProgress, busy_spinner};
use roadworthy_inspection::checklist::ChecklistDefinition;
use roadworthy_inspection::form::InspectionForm;
use roadworthy_inspection_models::Verdict;
use roadworthy_session::{InspectionSession, SessionError};

use crate::inspection_file::InspectionFile;
use crate::report::InspectionReport;

#[derive(Parser)]
#[command(name = "roadworthy", about = "Vehicle roadworthiness inspection")]
struct Cli {
    /// Checklist definition to use instead of the built-in one
    #[arg(long, global = true)]
    checklist: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the checklist grouped by category
    Checklist,
    /// Submit an inspection described in a TOML file
    Inspect {
        /// Inspection file
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = roadworthy_cli_utils::init_logger();
    let cli = Cli::parse();

    let definition = match &cli.checklist {
        Some(path) => {
            log::info!("Loading checklist from {}", path.display());
            Arc::new(ChecklistDefinition::from_path(path)?)
        }
        None => ChecklistDefinition::standard(),
    };

    match cli.command {
        Some(Commands::Checklist) => print_checklist(&definition),
        Some(Commands::Inspect { file, json }) => {
            let provider = provider_from_env().await;
            inspect(&file, definition, provider.as_ref(), &multi, json).await?;
        }
        None => {
            let provider = provider_from_env().await;
            let session = InspectionSession::new(InspectionForm::new(definition));
            interactive::run(session, provider.as_ref(), &multi).await?;
        }
    }

    Ok(())
}

/// Builds the analysis provider, falling back to one that always fails
/// (and so always yields the fallback analysis) when none is configured.
async fn provider_from_env() -> Box<dyn LlmProvider> {
    match create_provider_from_env().await {
        Ok(provider) => {
            log::info!("Using {} for safety analysis", provider.name());
            provider
        }
        Err(e) => {
            log::warn!("Safety analysis unavailable: {e}");
            Box::new(UnconfiguredProvider::new(e.to_string()))
        }
    }
}

/// Submits the session with a spinner shown while it is in flight.
pub(crate) async fn submit_with_spinner(
    session: &mut InspectionSession,
    provider: &dyn LlmProvider,
    multi: &MultiProgress,
) -> Result<Verdict, SessionError> {
    let spinner = busy_spinner(multi, "Analyzing inspection...");
    let result = session.submit(provider).await;
    spinner.finish_and_clear();
    result
}

async fn inspect(
    path: &Path,
    definition: Arc<ChecklistDefinition>,
    provider: &dyn LlmProvider,
    multi: &MultiProgress,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = InspectionFile::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let form = file.apply(&InspectionForm::new(definition), base_dir)?;

    let mut session = InspectionSession::new(form);
    let verdict = submit_with_spinner(&mut session, provider, multi).await?;
    log::debug!("Inspection {} resolved to {verdict}", path.display());

    let report = InspectionReport::new(session.form(), session.analysis());
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    Ok(())
}

fn print_checklist(definition: &ChecklistDefinition) {
    match &definition.name {
        Some(name) => println!("{name} ({})", definition.version),
        None => println!("{}", definition.version),
    }
    println!("{} items, * = critical", definition.items.len());

    for category in definition.categories() {
        println!();
        println!("{category}");
        println!("{}", "-".repeat(category.len()));
        for entry in definition.items.iter().filter(|e| e.category == category) {
            let marker = if entry.critical { "*" } else { " " };
            println!("  {marker} {:<14} {}", entry.id, entry.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use roadworthy_ai::analysis::fallback_result;
    use roadworthy_inspection_models::{FormField, InspectionStatus};
    use roadworthy_session::Phase;

    use super::*;

    fn filled_form() -> InspectionForm {
        [
            (FormField::InspectorName, "R. Ramdial"),
            (FormField::VehiclePlate, "PCG 4567"),
            (FormField::VehicleMake, "Toyota"),
            (FormField::VehicleModel, "Hilux"),
            (FormField::VinNumber, "JTFST22P300012345"),
        ]
        .into_iter()
        .fold(InspectionForm::standard(), |form, (field, value)| {
            form.set_field(field, value).unwrap()
        })
    }

    #[tokio::test]
    async fn spinner_submission_reaches_result_ready() {
        let mut session = InspectionSession::new(filled_form());
        let provider = UnconfiguredProvider::new("no credentials".to_string());

        let verdict = submit_with_spinner(&mut session, &provider, &MultiProgress::new())
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Fail);
        assert_eq!(session.phase(), Phase::ResultReady);
        assert_eq!(session.form().overall_status(), InspectionStatus::Fail);
        assert_eq!(session.analysis(), Some(&fallback_result()));
    }

    #[tokio::test]
    async fn spinner_submission_reports_missing_fields() {
        let mut session = InspectionSession::new(InspectionForm::standard());
        let provider = UnconfiguredProvider::new("no credentials".to_string());

        let err = submit_with_spinner(&mut session, &provider, &MultiProgress::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::MissingFields { .. }));
        assert_eq!(session.phase(), Phase::Editing);
    }
}
