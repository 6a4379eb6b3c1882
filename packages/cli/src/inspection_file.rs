//! Inspection files for non-interactive runs.
//!
//! ```toml
//! [vehicle]
//! inspectorName = "R. Ramdial"
//! vehiclePlate = "PCG 4567"
//! vehicleMake = "Toyota"
//! vehicleModel = "Hilux"
//! vehicleClass = "COMMERCIAL"
//! vinNumber = "JTFST22P300012345"
//!
//! [checklist]
//! all_passed = true
//! failed = ["mech_foot"]
//!
//! [notes]
//! mech_foot = "Pulls left under braking"
//!
//! [evidence]
//! mech_foot = "photos/brake.jpg"
//! ```
//!
//! Evidence paths are resolved relative to the inspection file. Everything
//! is applied through the regular form edits: `[vehicle]` keys are form
//! field names and go through [`InspectionForm::set_field`], so the vehicle
//! class accepts the same spellings as the interactive form. Checklist ids
//! the definition does not know are ignored (with a warning); unknown keys
//! anywhere are rejected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use roadworthy_inspection::FormError;
use roadworthy_inspection::form::InspectionForm;
use roadworthy_inspection_models::FormField;
use serde::Deserialize;

use crate::evidence::load_evidence;

/// Parsed inspection file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectionFile {
    /// Identification fields by form field name. A missing or blank
    /// inspection date means today.
    #[serde(default)]
    pub vehicle: BTreeMap<FormField, String>,
    /// Which checks passed.
    #[serde(default)]
    pub checklist: ChecklistResults,
    /// Defect notes by item id.
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    /// Photograph paths by item id.
    #[serde(default)]
    pub evidence: BTreeMap<String, PathBuf>,
}

/// Check results in an inspection file.
///
/// Either list the passed ids, or set `all_passed` and list the failures.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChecklistResults {
    /// Start from every check passed.
    #[serde(default)]
    pub all_passed: bool,
    /// Ids of checks that passed.
    #[serde(default)]
    pub passed: Vec<String>,
    /// Ids of checks that failed. Applied after `passed`.
    #[serde(default)]
    pub failed: Vec<String>,
}

impl InspectionFile {
    /// Parses an inspection file from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has unknown keys.
    pub fn parse(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(toml_str)
    }

    /// Reads and parses an inspection file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Applies the file to a fresh form. Evidence paths are resolved
    /// against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] if a `[vehicle]` value is rejected (e.g. an
    /// unknown vehicle class).
    pub fn apply(
        &self,
        form: &InspectionForm,
        base_dir: &Path,
    ) -> Result<InspectionForm, FormError> {
        let mut form = form.clone();
        for (&field, value) in &self.vehicle {
            if field == FormField::InspectionDate && value.trim().is_empty() {
                continue;
            }
            form = form.set_field(field, value)?;
        }

        if self.checklist.all_passed {
            let ids: Vec<String> = form.checklist().iter().map(|i| i.id.clone()).collect();
            for id in &ids {
                form = form.set_check(id, true);
            }
        }
        for id in &self.checklist.passed {
            warn_unknown(&form, id);
            form = form.set_check(id, true);
        }
        for id in &self.checklist.failed {
            warn_unknown(&form, id);
            form = form.set_check(id, false);
        }

        for (id, note) in &self.notes {
            warn_unknown(&form, id);
            form = form.set_note(id, note);
        }

        for (id, path) in &self.evidence {
            warn_unknown(&form, id);
            if let Some(image) = load_evidence(&base_dir.join(path)) {
                form = form.set_evidence(id, image);
            }
        }

        Ok(form)
    }
}

fn warn_unknown(form: &InspectionForm, id: &str) {
    if form.item(id).is_none() {
        log::warn!(
            "Checklist '{}' has no item '{id}'; ignoring",
            form.definition().version
        );
    }
}
