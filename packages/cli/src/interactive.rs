//! Interactive inspection form.
//!
//! Walks the inspector through the identification fields and the
//! checklist one category at a time, submits, and shows the result. From
//! the result the inspector can go back and edit, start a new inspection
//! of the same vehicle, or quit.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use roadworthy_ai::providers::LlmProvider;
use roadworthy_cli_utils::{MultiProgress, percent_bar};
use roadworthy_inspection_models::{FormField, VehicleClass};
use roadworthy_session::{InspectionSession, SessionError};

use crate::evidence::load_evidence;
use crate::report::InspectionReport;
use crate::submit_with_spinner;

/// Width of the per-category progress bars.
const BAR_WIDTH: usize = 10;

/// What to do after a result has been shown.
enum AfterResult {
    EditInspection,
    NewInspection,
    Quit,
}

impl AfterResult {
    const ALL: &[Self] = &[Self::EditInspection, Self::NewInspection, Self::Quit];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::EditInspection => "Edit inspection",
            Self::NewInspection => "New inspection",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the interactive form until the inspector quits.
///
/// # Errors
///
/// Returns an error if a prompt fails (e.g. the terminal is closed).
pub async fn run(
    mut session: InspectionSession,
    provider: &dyn LlmProvider,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Vehicle Roadworthiness Inspection");
    let definition = session.form().definition();
    println!(
        "Checklist {}",
        definition.name.as_deref().unwrap_or(&definition.version)
    );
    println!();

    edit_details(&mut session)?;

    loop {
        edit_until_submitted(&mut session, provider, multi).await?;

        println!();
        print!(
            "{}",
            InspectionReport::new(session.form(), session.analysis()).to_text()
        );
        println!();

        let labels: Vec<&str> = AfterResult::ALL.iter().map(AfterResult::label).collect();
        let idx = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match AfterResult::ALL[idx] {
            AfterResult::EditInspection => session.edit_again()?,
            AfterResult::NewInspection => session.new_inspection()?,
            AfterResult::Quit => return Ok(()),
        }
    }
}

/// Shows the category menu until a submission goes through.
async fn edit_until_submitted(
    session: &mut InspectionSession,
    provider: &dyn LlmProvider,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let progress = session.form().category_progress();

        let mut labels = vec!["Vehicle details".to_string()];
        labels.extend(progress.iter().map(|p| {
            format!(
                "{:<14} {:>2}/{:<2} {}",
                p.category,
                p.passed,
                p.total,
                percent_bar(p.percent(), BAR_WIDTH)
            )
        }));
        labels.push(format!(
            "Submit inspection ({}% complete)",
            session.form().progress_percent()
        ));

        let idx = Select::new()
            .with_prompt("Inspection")
            .items(&labels)
            .default(0)
            .interact()?;

        if idx == 0 {
            edit_details(session)?;
        } else if idx == labels.len() - 1 {
            match submit_with_spinner(session, provider, multi).await {
                Ok(_) => return Ok(()),
                Err(SessionError::MissingFields { fields }) => {
                    println!();
                    println!("Cannot submit yet. Please fill in:");
                    for field in fields {
                        println!("  - {}", field.label());
                    }
                    println!();
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            let category = progress[idx - 1].category.clone();
            edit_category(session, &category)?;
        }
    }
}

/// Prompts for every identification field, offering the current values
/// as defaults.
fn edit_details(session: &mut InspectionSession) -> Result<(), Box<dyn std::error::Error>> {
    for &field in FormField::ALL {
        if field == FormField::VehicleClass {
            let current = session.form().details().vehicle_class;
            let labels: Vec<String> = VehicleClass::all().iter().map(ToString::to_string).collect();
            let default = VehicleClass::all()
                .iter()
                .position(|class| *class == current)
                .unwrap_or(0);
            let idx = Select::new()
                .with_prompt(field.label())
                .items(&labels)
                .default(default)
                .interact()?;
            let class = VehicleClass::all()[idx];
            session.apply(|form| {
                let mut details = form.details().clone();
                details.vehicle_class = class;
                form.with_details(details)
            })?;
            continue;
        }

        let prompt = if field.is_required() {
            format!("{} *", field.label())
        } else {
            field.label().to_string()
        };
        let value: String = Input::new()
            .with_prompt(prompt)
            .with_initial_text(session.form().details().get(field))
            .allow_empty(true)
            .interact_text()?;
        session.try_apply(|form| form.set_field(field, &value))?;
    }
    Ok(())
}

/// Confirms each item in a category. Failing items are asked for a defect
/// note and an optional photograph.
fn edit_category(
    session: &mut InspectionSession,
    category: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let items: Vec<_> = session.form().items_in(category).cloned().collect();

    println!();
    println!("{category}");

    for item in items {
        let marker = if item.is_critical { " [critical]" } else { "" };
        let passed = Confirm::new()
            .with_prompt(format!("{}{marker} passes?", item.label))
            .default(item.value)
            .interact()?;
        session.apply(|form| form.set_check(&item.id, passed))?;

        if passed {
            continue;
        }

        let note: String = Input::new()
            .with_prompt("  Defect note")
            .with_initial_text(item.notes.clone().unwrap_or_default())
            .allow_empty(true)
            .interact_text()?;
        session.apply(|form| form.set_note(&item.id, &note))?;

        if item.image.is_some()
            && Confirm::new()
                .with_prompt("  Remove the attached photo?")
                .default(false)
                .interact()?
        {
            session.apply(|form| form.clear_evidence(&item.id))?;
        }

        let path: String = Input::new()
            .with_prompt("  Photo path (blank to skip)")
            .allow_empty(true)
            .interact_text()?;
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        if let Some(image) = load_evidence(&PathBuf::from(path)) {
            session.apply(|form| form.set_evidence(&item.id, image))?;
        } else {
            println!("  No photo attached.");
        }
    }

    Ok(())
}
